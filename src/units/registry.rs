use log::debug;
use thiserror::Error;

use crate::units::catalog::BUILTIN_UNITS;
use crate::units::UnitDescriptor;

/// Configuration errors raised while building the unit catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a unit named '{0}' is already registered")]
    DuplicateName(String),

    #[error("unit descriptor has no name")]
    Unnamed,
}

/// Catalog of available collection units.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<UnitDescriptor>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in unit
    pub fn with_builtin_units() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in BUILTIN_UNITS {
            registry.register(*descriptor)?;
        }
        Ok(registry)
    }

    /// Add a unit; names must be non-empty and unique
    pub fn register(&mut self, descriptor: UnitDescriptor) -> Result<(), RegistryError> {
        if descriptor.name.is_empty() {
            return Err(RegistryError::Unnamed);
        }
        if self.get(descriptor.name).is_some() {
            return Err(RegistryError::DuplicateName(descriptor.name.to_string()));
        }
        debug!("Registered unit {}", descriptor.identity());
        self.units.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&UnitDescriptor> {
        self.units.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Full catalog: live-only units first, then the rest, each group in
    /// registration order
    pub fn all(&self) -> Vec<&UnitDescriptor> {
        let (live, other): (Vec<&UnitDescriptor>, Vec<&UnitDescriptor>) =
            self.units.iter().partition(|d| d.live_only);
        live.into_iter().chain(other).collect()
    }

    /// Identities of [`all`](Self::all), in the same order
    pub fn identities(&self) -> Vec<String> {
        self.all().iter().map(|d| d.identity()).collect()
    }
}
