//! # mac_triage
//!
//! A modular forensic artifact collector for macOS, usable against the
//! running system or against a mounted disk image.
//!
//! ## Overview
//!
//! Every artifact source is a collection unit registered in a catalog. A run
//! resolves the host identity, turns include/exclude tokens into an ordered
//! plan, executes each unit in isolation (sequentially or on a worker pool)
//! and folds every output file into a single gzip-compressed tar archive.
//!
//! ## Features
//!
//! - **Live and image collection**: units that need a running system are
//!   skipped against images
//! - **Failure isolation**: an error or panic in one unit never stops the others
//! - **Buffered record sinks**: CSV or line-delimited JSON, safe to share across threads
//! - **Incremental archiving**: outputs are appended and deleted as each unit finishes
//! - **Run summary**: plan, invalid tokens and per-unit outcomes in JSON
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use mac_triage::config::CollectionOptions;
//! use mac_triage::identity::{generate_run_id, RunIdentity};
//! use mac_triage::models::RunContext;
//! use mac_triage::orchestrator::{plan, Orchestrator};
//! use mac_triage::output::ArchiveBuilder;
//! use mac_triage::units::registry::UnitRegistry;
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = CollectionOptions::default();
//! let run_id = generate_run_id(options.archiving());
//! let identity = RunIdentity::resolve(run_id.clone(), Utc::now(), &options);
//! let archive = ArchiveBuilder::new(&options.output_dir, &identity.prefix, &run_id);
//! let ctx = Arc::new(RunContext::new(options, identity, None));
//!
//! let registry = UnitRegistry::with_builtin_units()?;
//! let run_plan = plan(&["bash", "ssh"], &registry.all());
//!
//! let orchestrator = Orchestrator::new(ctx, &registry, Some(archive));
//! let reports = orchestrator.execute(&run_plan, false)?;
//! orchestrator.finish(&run_plan, &reports)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: Collection options and YAML configuration
//! - [`identity`]: Run id, host identity and naming prefix
//! - [`models`]: Run context shared with units
//! - [`units`]: Collection unit trait, catalog and built-in units
//! - [`orchestrator`]: Run planning and unit execution
//! - [`output`]: Record sinks and the archive builder
//! - [`utils`]: Hashing, stat, plist and command helpers
//! - [`privileges`]: Root check and process priority
//!
//! ## Safety
//!
//! `unsafe` is limited to the libc calls for the effective user id, the
//! process priority and the interrupt handler.

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Collection options and configuration files
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Run identity and naming prefix
pub mod identity;

/// Interrupt flag shared by all units
pub mod interrupt;

/// Core data models and structures used throughout the application
pub mod models;

/// Run planning and unit execution
pub mod orchestrator;

/// Record sinks and archiving
pub mod output;

/// Root check and process priority
pub mod privileges;

/// Collection units and their registry
pub mod units;

/// Utility functions for hashing, metadata and external tools
pub mod utils;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
