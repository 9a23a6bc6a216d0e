//! Collection units and their catalog.
//!
//! A unit extracts one artifact family and writes it through record sinks
//! opened from the shared [`RunContext`]. Units are described by a static
//! [`UnitDescriptor`] and built fresh for every run from its factory.

use std::sync::Arc;

use anyhow::Result;

use crate::models::RunContext;

/// Built-in unit table
pub mod catalog;

/// Name-keyed unit registry with duplicate detection
pub mod registry;

pub mod bash;
pub mod dirlist;
pub mod ssh;
pub mod systeminfo;
pub mod volatile;

pub use registry::{RegistryError, UnitRegistry};

/// One unit of collection work
pub trait CollectionUnit: Send {
    /// Collect the artifact; an error fails this unit only
    fn run(&mut self) -> Result<()>;
}

/// Builds a unit bound to the run context
pub type UnitFactory = fn(Arc<RunContext>) -> Box<dyn CollectionUnit>;

/// Static description of a collection unit
#[derive(Debug, Clone, Copy)]
pub struct UnitDescriptor {
    /// Short token, also used in output file names
    pub name: &'static str,
    /// Dotted version, such as `1.0.0`
    pub version: &'static str,
    /// Only meaningful against the running system
    pub live_only: bool,
    pub description: &'static str,
    pub factory: UnitFactory,
}

impl UnitDescriptor {
    /// Full identity matched by selection tokens, such as `mod_live_pslist_v100`
    pub fn identity(&self) -> String {
        let live = if self.live_only { "live_" } else { "" };
        format!("mod_{}{}_v{}", live, self.name, self.version.replace('.', ""))
    }

    pub fn instantiate(&self, ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
        (self.factory)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl CollectionUnit for Noop {
        fn run(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn noop(_ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
        Box::new(Noop)
    }

    #[test]
    fn test_identity_format() {
        let live = UnitDescriptor {
            name: "pslist",
            version: "1.0.0",
            live_only: true,
            description: "",
            factory: noop,
        };
        assert_eq!(live.identity(), "mod_live_pslist_v100");

        let other = UnitDescriptor { name: "bash", live_only: false, version: "1.0.1", ..live };
        assert_eq!(other.identity(), "mod_bash_v101");
    }
}
