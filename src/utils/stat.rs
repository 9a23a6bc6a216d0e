//! File metadata in the shape shared by every record that describes a file.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::constants::TIMESTAMP_FORMAT;

const ERROR: &str = "ERROR";

/// Stat fields of one path. Every value is text so records stay uniform.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileStat {
    pub mode: String,
    pub size: String,
    pub uid: String,
    pub gid: String,
    pub mtime: String,
    pub atime: String,
    pub ctime: String,
    pub btime: String,
    pub path: String,
    pub name: String,
}

impl FileStat {
    fn error(path: &Path) -> Self {
        Self {
            mode: ERROR.to_string(),
            size: ERROR.to_string(),
            uid: ERROR.to_string(),
            gid: ERROR.to_string(),
            mtime: ERROR.to_string(),
            atime: ERROR.to_string(),
            ctime: ERROR.to_string(),
            btime: ERROR.to_string(),
            path: path.to_string_lossy().into_owned(),
            name: ERROR.to_string(),
        }
    }
}

/// Stat `path` without following symlinks.
///
/// Directories report their full path and an empty name; regular files
/// report the parent with a trailing slash plus the file name. When the
/// path cannot be read every field except `path` is `ERROR`.
pub fn stat_path(path: &Path) -> FileStat {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return FileStat::error(path),
    };

    let file_type = metadata.file_type();
    let mode = if file_type.is_dir() {
        "Directory"
    } else if file_type.is_file() {
        "Regular File"
    } else {
        "Other"
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (dir, name) = match mode {
        "Directory" => (path.to_string_lossy().into_owned(), String::new()),
        "Regular File" => (format!("{}/", parent), name),
        _ => (parent, name),
    };

    FileStat {
        mode: mode.to_string(),
        size: metadata.len().to_string(),
        uid: metadata.uid().to_string(),
        gid: metadata.gid().to_string(),
        mtime: format_epoch(metadata.mtime()),
        atime: format_epoch(metadata.atime()),
        ctime: format_epoch(metadata.ctime()),
        btime: metadata.created().map(format_system_time).unwrap_or_default(),
        path: collapse_slashes(&dir),
        name,
    }
}

/// Format seconds since the epoch in UTC
pub fn format_epoch(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| ERROR.to_string())
}

fn format_system_time(time: SystemTime) -> String {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => format_epoch(d.as_secs() as i64),
        Err(e) => format_epoch(-(e.duration().as_secs() as i64)),
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}
