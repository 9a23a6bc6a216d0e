//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;

use mac_triage::config::CollectionOptions;
use mac_triage::identity::RunIdentity;
use mac_triage::models::RunContext;

pub const RUN_ID: &str = "-Tst0123456";

/// Options for an image-style run reading `input` and writing to `output`
pub fn options(input: &Path, output: &Path) -> CollectionOptions {
    CollectionOptions {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        forensic_mode: true,
        workers: 4,
        ..CollectionOptions::default()
    }
}

pub fn identity(run_id: &str) -> RunIdentity {
    RunIdentity::new(
        run_id.to_string(),
        "case",
        "testhost".to_string(),
        "192.168.1.20".to_string(),
        "C02TEST".to_string(),
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 52).unwrap(),
    )
}

pub fn context(options: CollectionOptions, run_id: &str) -> Arc<RunContext> {
    Arc::new(RunContext::new(options, identity(run_id), Some("14.2".to_string())))
}

/// Entry names of a gzip-compressed tar, in archive order
pub fn archive_entries(path: &Path) -> Result<Vec<String>> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path)?));
    let mut names = Vec::new();
    for entry in archive.entries()? {
        names.push(entry?.path()?.to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Contents of the archive entry called `name`
pub fn archive_entry_text(path: &Path, name: &str) -> Result<Option<String>> {
    use std::io::Read;

    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path)?));
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.to_string_lossy() == name {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return Ok(Some(content));
        }
    }
    Ok(None)
}

/// Names of the files left in a directory
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();
    Ok(names)
}

pub fn output_path(ctx: &RunContext, name: &str, ext: &str) -> PathBuf {
    ctx.output_dir().join(format!(
        "{},{}{}.{}",
        ctx.identity.prefix, name, ctx.identity.run_id, ext
    ))
}
