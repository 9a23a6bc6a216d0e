use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, ErrorCode, OpenFlags};

use crate::constants::{SCRATCH_DB_SUFFIX, SERIAL_DB_DIR, SERIAL_DB_SUFFIXES, SERIAL_ERROR, SERIAL_QUERY};

/// Read the hardware serial number from the system cache databases.
///
/// Every candidate database is tried in name order. A database that is busy
/// or locked is copied into `scratch_dir` and queried once more.
pub fn resolve_serial(input_root: &Path, scratch_dir: &Path) -> String {
    let candidates = serial_databases(&input_root.join(SERIAL_DB_DIR));
    if candidates.is_empty() {
        debug!("No serial number databases found under {}", SERIAL_DB_DIR);
    }

    for db in &candidates {
        match query_with_retry(db, scratch_dir) {
            Ok(serial) if !serial.is_empty() => return serial,
            Ok(_) => debug!("Empty serial number in {}", db.display()),
            Err(e) => warn!("Could not read serial number from {}: {:#}", db.display(), e),
        }
    }

    SERIAL_ERROR.to_string()
}

fn serial_databases(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut dbs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.to_string_lossy();
            SERIAL_DB_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
        })
        .collect();
    dbs.sort();
    dbs
}

fn query_with_retry(db: &Path, scratch_dir: &Path) -> Result<String> {
    match query_serial(db) {
        Ok(serial) => Ok(serial),
        Err(e) if is_locked(&e) => {
            debug!("{} is locked, querying a copy", db.display());
            let file_name = db.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let copy = scratch_dir.join(format!("{}{}", file_name, SCRATCH_DB_SUFFIX));
            fs::copy(db, &copy)
                .context(format!("Failed to copy {} to {}", db.display(), copy.display()))?;

            let result = query_serial(&copy)
                .context(format!("Query failed on copy of {}", db.display()));
            if let Err(e) = fs::remove_file(&copy) {
                warn!("Could not remove scratch copy {}: {}", copy.display(), e);
            }
            result
        }
        Err(e) => Err(e).context(format!("Query failed on {}", db.display())),
    }
}

/// Run the serial query against one database opened read-only
pub fn query_serial(db: &Path) -> rusqlite::Result<String> {
    let conn = Connection::open_with_flags(db, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    conn.query_row(SERIAL_QUERY, [], |row| row.get::<_, String>(0))
}

fn is_locked(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
