//! Test utilities for mac_triage
//!
//! Shared fixtures for unit tests: throwaway unit descriptors, a small
//! catalog and a run context rooted in a temporary directory.

#![cfg(test)]

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};

use crate::config::CollectionOptions;
use crate::identity::RunIdentity;
use crate::models::RunContext;
use crate::units::{CollectionUnit, UnitDescriptor};

struct NoopUnit;

impl CollectionUnit for NoopUnit {
    fn run(&mut self) -> Result<()> {
        Ok(())
    }
}

fn noop(_ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(NoopUnit)
}

/// Descriptor for a unit that does nothing
pub fn descriptor(name: &'static str, live_only: bool) -> UnitDescriptor {
    UnitDescriptor {
        name,
        version: "1.0.0",
        live_only,
        description: "test unit",
        factory: noop,
    }
}

/// Catalog of two live units followed by two image units
pub fn sample_catalog() -> Vec<UnitDescriptor> {
    vec![
        descriptor("ps", true),
        descriptor("netstat", true),
        descriptor("chrome", false),
        descriptor("bash", false),
    ]
}

/// Run context with both input and output rooted at `dir`
pub fn test_context(dir: &Path, run_id: &str) -> RunContext {
    let options = CollectionOptions {
        input_dir: dir.to_path_buf(),
        output_dir: dir.to_path_buf(),
        forensic_mode: true,
        ..CollectionOptions::default()
    };
    let identity = RunIdentity::new(
        run_id.to_string(),
        "test",
        "host".to_string(),
        "10.0.0.1".to_string(),
        "SERIAL".to_string(),
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    );
    RunContext::new(options, identity, Some("14.0".to_string()))
}
