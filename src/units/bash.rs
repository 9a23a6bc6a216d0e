use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;

use crate::models::RunContext;
use crate::output::Record;
use crate::units::{CollectionUnit, UnitDescriptor};
use crate::utils::stat::stat_path;

pub const DESCRIPTOR: UnitDescriptor = UnitDescriptor {
    name: "bash",
    version: "1.0.0",
    live_only: false,
    description: "Shell history and bash session files of every user",
    factory: create,
};

const HEADERS: &[&str] = &[
    "mtime", "atime", "ctime", "btime", "src_file", "user", "item_index", "cmd",
];

fn create(ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(ShellHistoryUnit { ctx })
}

#[derive(Debug, Serialize)]
struct HistoryRecord<'a> {
    mtime: &'a str,
    atime: &'a str,
    ctime: &'a str,
    btime: &'a str,
    src_file: &'a str,
    user: &'a str,
    item_index: usize,
    cmd: &'a str,
}

pub struct ShellHistoryUnit {
    ctx: Arc<RunContext>,
}

impl CollectionUnit for ShellHistoryUnit {
    fn run(&mut self) -> Result<()> {
        let sink = self.ctx.open_sink(DESCRIPTOR.name, HEADERS)?;

        for home in self.ctx.user_homes() {
            let files = history_files(&home.path);
            if files.is_empty() {
                debug!("No shell history found in {}", home.path.display());
                continue;
            }

            for file in files {
                self.ctx.check_interrupt()?;

                let content = match fs::read(&file) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(e) => {
                        warn!("Could not read {}: {}", file.display(), e);
                        continue;
                    }
                };
                let stat = stat_path(&file);

                for (index, line) in content.lines().enumerate() {
                    let record = HistoryRecord {
                        mtime: &stat.mtime,
                        atime: &stat.atime,
                        ctime: &stat.ctime,
                        btime: &stat.btime,
                        src_file: &stat.name,
                        user: &home.user,
                        item_index: index + 1,
                        cmd: line.trim_end(),
                    };
                    sink.write_record(Record::from_serialize(&record)?);
                }
            }
        }

        sink.flush();
        info!("Recorded {} shell history lines", sink.records_written());
        Ok(())
    }
}

/// `.*_history` files followed by everything in `.bash_sessions`
fn history_files(home: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = list_files(home)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy())
                .map(|n| n.starts_with('.') && n.ends_with("_history"))
                .unwrap_or(false)
        })
        .collect();
    files.extend(list_files(&home.join(".bash_sessions")));
    files
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}
