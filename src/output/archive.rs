use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, error, info, warn};

use crate::constants::{ARCHIVE_COPY_BUFFER_SIZE, TAR_END_MARKER_SIZE};

/// Incremental tar container for one run.
///
/// Each finished output is appended with a full open, append, close cycle and
/// then deleted from the output directory, so a run interrupted halfway still
/// leaves a readable archive of everything ingested so far. Appends are
/// serialized by an internal lock.
pub struct ArchiveBuilder {
    output_dir: PathBuf,
    run_id: String,
    tar_path: PathBuf,
    lock: Mutex<()>,
}

impl ArchiveBuilder {
    /// Create a builder for `{output_dir}/{prefix}.tar`; nothing touches disk yet
    pub fn new(output_dir: impl Into<PathBuf>, prefix: &str, run_id: &str) -> Self {
        let output_dir = output_dir.into();
        let tar_path = output_dir.join(format!("{}.tar", prefix));
        Self {
            output_dir,
            run_id: run_id.to_string(),
            tar_path,
            lock: Mutex::new(()),
        }
    }

    pub fn tar_path(&self) -> &Path {
        &self.tar_path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Name recorded in the archive: the file name with the run id removed
    pub fn entry_name(&self, file_name: &str) -> String {
        if self.run_id.is_empty() {
            file_name.to_string()
        } else {
            file_name.replace(&self.run_id, "")
        }
    }

    /// Append `file_name` (relative to the output directory) and delete the source.
    ///
    /// Directories are added recursively. A source that cannot be removed
    /// after a successful append is logged and left behind.
    pub fn add_file(&self, file_name: &str) -> Result<()> {
        let source = self.output_dir.join(file_name);
        let entry_name = self.entry_name(file_name);

        {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.append(&source, &entry_name)
                .context(format!("Failed to add {} to {}", source.display(), self.tar_path.display()))?;
        }
        debug!("Added {} to archive as {}", file_name, entry_name);

        let removed = if source.is_dir() {
            fs::remove_dir_all(&source)
        } else {
            fs::remove_file(&source)
        };
        if let Err(e) = removed {
            error!("Added {} to archive, but could not delete it: {}", file_name, e);
        }

        Ok(())
    }

    fn append(&self, source: &Path, entry_name: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.tar_path)?;

        // Overwrite the two zero blocks that end the previous stream
        let len = file.metadata()?.len();
        if len >= TAR_END_MARKER_SIZE {
            file.seek(SeekFrom::Start(len - TAR_END_MARKER_SIZE))?;
        }

        let mut builder = tar::Builder::new(file);
        if source.is_dir() {
            builder.append_dir_all(entry_name, source)?;
        } else {
            builder.append_path_with_name(source, entry_name)?;
        }
        let file = builder.into_inner()?;
        file.sync_all()?;
        Ok(())
    }

    /// Add every file in the output directory that still carries the run id.
    ///
    /// Returns the number of entries ingested.
    pub fn sweep_stragglers(&self) -> usize {
        if self.run_id.is_empty() {
            return 0;
        }

        let entries = match fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list {} for leftovers: {}", self.output_dir.display(), e);
                return 0;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(&self.run_id))
            .collect();
        names.sort();

        let mut added = 0;
        for name in names {
            match self.add_file(&name) {
                Ok(()) => added += 1,
                Err(e) => error!("Could not archive leftover {}: {:#}", name, e),
            }
        }
        if added > 0 {
            info!("Archived {} leftover files", added);
        }
        added
    }

    /// Compress the tar into `{prefix}.tar.gz` and delete the tar.
    ///
    /// Returns `None` when nothing was ever archived.
    pub fn finalize(&self) -> Result<Option<PathBuf>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.tar_path.exists() {
            info!("No info collected, no archive created");
            return Ok(None);
        }

        let start = Instant::now();
        let mut gz_name = self.tar_path.clone().into_os_string();
        gz_name.push(".gz");
        let gz_path = PathBuf::from(gz_name);

        let input = File::open(&self.tar_path)
            .context(format!("Failed to open {}", self.tar_path.display()))?;
        let output = File::create(&gz_path)
            .context(format!("Failed to create {}", gz_path.display()))?;

        let mut reader = BufReader::with_capacity(ARCHIVE_COPY_BUFFER_SIZE, input);
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
        io::copy(&mut reader, &mut encoder)
            .context(format!("Failed to compress {}", self.tar_path.display()))?;
        let writer = encoder.finish()
            .context("Failed to finish gzip stream")?;
        writer.into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;

        fs::remove_file(&self.tar_path)
            .context(format!("Failed to remove {}", self.tar_path.display()))?;

        info!("Compressed archive {} in {:?}", gz_path.display(), start.elapsed());
        Ok(Some(gz_path))
    }
}
