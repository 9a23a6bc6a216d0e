use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::interrupt::{self, Interrupted};
use crate::models::RunContext;
use crate::orchestrator::planner::RunPlan;
use crate::output::ArchiveBuilder;
use crate::units::UnitRegistry;
use crate::utils::summary::write_run_summary;

/// How a unit invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOutcome {
    Completed,
    Failed,
    Panicked,
    Killed,
    /// The plan named a unit the registry does not know
    Unknown,
}

/// Result of one unit invocation
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub version: String,
    pub outcome: UnitOutcome,
    pub error: Option<String>,
    /// Output files produced by the unit, as named in the output directory
    pub files: Vec<String>,
    pub duration_secs: f64,
}

/// Drives a run plan over the registry and feeds finished outputs to the archive.
pub struct Orchestrator<'a> {
    ctx: Arc<RunContext>,
    registry: &'a UnitRegistry,
    archive: Option<ArchiveBuilder>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: Arc<RunContext>, registry: &'a UnitRegistry, archive: Option<ArchiveBuilder>) -> Self {
        Self { ctx, registry, archive }
    }

    pub fn archive(&self) -> Option<&ArchiveBuilder> {
        self.archive.as_ref()
    }

    /// Run every planned unit and return one report per unit, in plan order.
    ///
    /// Sequential mode uses a single worker; parallel mode uses the
    /// configured worker count. Either way a unit that fails, panics or is
    /// interrupted affects only its own report.
    pub fn execute(&self, plan: &RunPlan, parallel: bool) -> Result<Vec<UnitReport>> {
        let threads = if parallel { self.ctx.options.workers.max(1) } else { 1 };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("unit-worker-{}", i))
            .build()
            .context("Failed to build unit worker pool")?;

        info!("Running {} units ({} mode, {} workers)",
              plan.len(), if parallel { "parallel" } else { "sequential" }, threads);

        let reports = if parallel {
            let reports = pool.install(|| {
                plan.units.par_iter().map(|name| self.run_unit(name)).collect::<Vec<_>>()
            });
            interrupt::clear();
            reports
        } else {
            pool.install(|| {
                plan.units
                    .iter()
                    .map(|name| {
                        let report = self.run_unit(name);
                        interrupt::clear();
                        report
                    })
                    .collect::<Vec<_>>()
            })
        };

        Ok(reports)
    }

    /// Run one unit in isolation and archive whatever it produced
    pub fn run_unit(&self, name: &str) -> UnitReport {
        let start = Instant::now();

        let Some(descriptor) = self.registry.get(name) else {
            error!("{} is not a registered unit", name);
            return UnitReport {
                name: name.to_string(),
                version: String::new(),
                outcome: UnitOutcome::Unknown,
                error: Some("not registered".to_string()),
                files: Vec::new(),
                duration_secs: 0.0,
            };
        };

        info!("Running {} (v{})", descriptor.name, descriptor.version);

        let ctx = Arc::clone(&self.ctx);
        // The unit and its sinks are dropped inside the closure, so buffers
        // are flushed before outputs are collected
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut unit = descriptor.instantiate(ctx);
            unit.run()
        }));

        let (outcome, error) = match result {
            Ok(Ok(())) => (UnitOutcome::Completed, None),
            Ok(Err(e)) if e.downcast_ref::<Interrupted>().is_some() => {
                warn!("{} was killed", descriptor.name);
                (UnitOutcome::Killed, Some(e.to_string()))
            }
            Ok(Err(e)) => {
                error!("{} failed: {:?}", descriptor.name, e);
                (UnitOutcome::Failed, Some(format!("{:#}", e)))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("{} failed: panicked: {}", descriptor.name, message);
                (UnitOutcome::Panicked, Some(message))
            }
        };

        let files = self.collect_outputs(descriptor.name);
        let elapsed = start.elapsed();
        info!("{} finished in {:.2?}", descriptor.name, elapsed);

        UnitReport {
            name: descriptor.name.to_string(),
            version: descriptor.version.to_string(),
            outcome,
            error,
            files,
            duration_secs: elapsed.as_secs_f64(),
        }
    }

    /// Find the unit's output files and hand each to the archive
    fn collect_outputs(&self, name: &str) -> Vec<String> {
        let identity = &self.ctx.identity;
        let entries = match fs::read_dir(self.ctx.output_dir()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list {}: {}", self.ctx.output_dir().display(), e);
                return Vec::new();
            }
        };

        let mut files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|file| is_unit_output(file, &identity.prefix, name, &identity.run_id))
            .collect();
        files.sort();

        if files.is_empty() {
            debug!("{} produced no output files", name);
        }

        if let Some(archive) = &self.archive {
            for file in &files {
                if let Err(e) = archive.add_file(file) {
                    error!("Could not archive {}: {:#}", file, e);
                }
            }
        }

        files
    }

    /// Write the run summary, sweep leftovers into the archive and compress it.
    ///
    /// Returns the compressed archive path, or `None` when archiving is off
    /// or nothing was archived.
    pub fn finish(&self, plan: &RunPlan, reports: &[UnitReport]) -> Result<Option<PathBuf>> {
        if let Err(e) = write_run_summary(&self.ctx, plan, reports) {
            error!("Could not write run summary: {:#}", e);
        }

        let Some(archive) = &self.archive else {
            return Ok(None);
        };
        archive.sweep_stragglers();
        archive.finalize()
    }
}

/// Whether `file` is an output of unit `name` in this run.
///
/// Outputs are `{prefix},{name}` followed by the run id, an extension or an
/// underscore-separated suffix, and always carry the run id.
pub fn is_unit_output(file: &str, prefix: &str, name: &str, run_id: &str) -> bool {
    let Some(rest) = file.strip_prefix(&format!("{},{}", prefix, name)) else {
        return false;
    };
    let boundary = rest.starts_with('.')
        || rest.starts_with('_')
        || (!run_id.is_empty() && rest.starts_with(run_id));
    boundary && file.contains(run_id)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
