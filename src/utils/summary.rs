use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::identity::format_timestamp;
use crate::models::RunContext;
use crate::orchestrator::{RunPlan, UnitOutcome, UnitReport};

/// Create a JSON summary of the run.
///
/// Records the identity, the plan with any rejected tokens, and the outcome
/// of every unit so an analyst can tell an empty output from a failed unit.
///
/// # Example Output
///
/// ```json
/// {
///   "prefix": "mac-triage-output,host,10.0.0.5,2024-01-15T14_30_52Z",
///   "run_id": "-a1B2c3D4e5",
///   "units": [{"name": "bash", "outcome": "completed", ...}],
///   "completed": 1,
///   "failed": 0
/// }
/// ```
pub fn create_run_summary(ctx: &RunContext, plan: &RunPlan, reports: &[UnitReport]) -> Result<String> {
    let identity = &ctx.identity;
    let completed = reports.iter().filter(|r| r.outcome == UnitOutcome::Completed).count();

    let summary = json!({
        "prefix": identity.prefix,
        "run_id": identity.run_id,
        "hostname": identity.hostname,
        "address": identity.address,
        "serial": identity.serial,
        "start_time": identity.timestamp(),
        "end_time": format_timestamp(&Utc::now()),
        "os_version": ctx.os_version,
        "collector_version": env!("CARGO_PKG_VERSION"),
        "input_dir": ctx.options.input_dir,
        "forensic_mode": ctx.options.forensic_mode,
        "live": ctx.is_live(),
        "output_format": ctx.options.output_format,
        "parallel": ctx.options.parallel,
        "plan": plan,
        "units": reports,
        "completed": completed,
        "failed": reports.len() - completed,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize run summary to JSON")
}

/// Write the summary as `{prefix},summary{run_id}.json` in the output directory
pub fn write_run_summary(ctx: &RunContext, plan: &RunPlan, reports: &[UnitReport]) -> Result<PathBuf> {
    let content = create_run_summary(ctx, plan, reports)?;
    let path = ctx.output_dir().join(format!(
        "{},summary{}.json",
        ctx.identity.prefix, ctx.identity.run_id
    ));

    fs::write(&path, content)
        .context(format!("Failed to write run summary to {}", path.display()))?;

    info!("Run summary written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;
    use serde_json::Value;
    use tempfile::TempDir;

    fn report(name: &str, outcome: UnitOutcome) -> UnitReport {
        UnitReport {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            outcome,
            error: None,
            files: Vec::new(),
            duration_secs: 0.5,
        }
    }

    #[test]
    fn test_summary_counts() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(temp_dir.path(), "-abc");
        let plan = RunPlan {
            units: vec!["bash".to_string(), "ssh".to_string()],
            invalid: vec!["bogus".to_string()],
        };
        let reports = vec![
            report("bash", UnitOutcome::Completed),
            report("ssh", UnitOutcome::Failed),
        ];

        let json: Value = serde_json::from_str(&create_run_summary(&ctx, &plan, &reports).unwrap()).unwrap();
        assert_eq!(json["completed"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["plan"]["invalid"][0], "bogus");
        assert_eq!(json["units"][1]["outcome"], "failed");
        assert_eq!(json["run_id"], "-abc");
    }

    #[test]
    fn test_summary_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(temp_dir.path(), "-abc");
        let path = write_run_summary(&ctx, &RunPlan::default(), &[]).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("{},summary-abc.json", ctx.identity.prefix));
        assert!(path.exists());
    }
}
