use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info};
use serde::Serialize;
use sysinfo::{PidExt, ProcessExt, ProcessStatus, System, SystemExt, UserExt};

use crate::models::RunContext;
use crate::output::Record;
use crate::units::{CollectionUnit, UnitDescriptor};
use crate::utils::stat::format_epoch;

pub const DESCRIPTOR: UnitDescriptor = UnitDescriptor {
    name: "pslist",
    version: "1.0.0",
    live_only: true,
    description: "Running processes with owner, state and command line",
    factory: create,
};

const HEADERS: &[&str] = &["pid", "ppid", "user", "state", "proc_start", "runtime", "cmd"];

fn create(ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(ProcessListUnit { ctx })
}

/// Process table entry
#[derive(Debug, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: Option<u32>,
    pub user: String,
    pub state: String,
    pub proc_start: String,
    pub runtime: String,
    pub cmd: String,
}

pub struct ProcessListUnit {
    ctx: Arc<RunContext>,
}

impl CollectionUnit for ProcessListUnit {
    fn run(&mut self) -> Result<()> {
        if !self.ctx.is_live() {
            error!("Module did not run: input is not a live system!");
            return Ok(());
        }

        let sink = self.ctx.open_sink(DESCRIPTOR.name, HEADERS)?;
        let mut system = System::new_all();
        system.refresh_all();

        let mut processes: Vec<_> = system.processes().iter().collect();
        processes.sort_by_key(|(pid, _)| pid.as_u32());

        for (pid, process) in processes {
            self.ctx.check_interrupt()?;

            let user = process
                .user_id()
                .and_then(|uid| system.get_user_by_id(uid))
                .map(|u| u.name().to_string())
                .unwrap_or_default();

            let cmd = if process.cmd().is_empty() {
                process.name().to_string()
            } else {
                process.cmd().join(" ")
            };

            let record = ProcessRecord {
                pid: pid.as_u32(),
                ppid: process.parent().map(|p| p.as_u32()),
                user,
                state: status_name(process.status()).to_string(),
                proc_start: format_epoch(process.start_time() as i64),
                runtime: format_runtime(process.run_time()),
                cmd,
            };
            sink.write_record(Record::from_serialize(&record)?);
        }

        sink.flush();
        info!("Recorded {} processes", sink.records_written());
        debug!("Process list written to {}", sink.path().display());
        Ok(())
    }
}

fn status_name(status: ProcessStatus) -> &'static str {
    match status {
        ProcessStatus::Run => "Running",
        ProcessStatus::Sleep => "Sleeping",
        ProcessStatus::Stop => "Stopped",
        ProcessStatus::Zombie => "Zombie",
        ProcessStatus::Idle => "Idle",
        _ => "Unknown",
    }
}

/// Elapsed seconds as `H:MM:SS`
fn format_runtime(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
