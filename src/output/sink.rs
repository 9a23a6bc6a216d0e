use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use log::{debug, error};
use serde_json::{Map, Value};

use crate::config::OutputFormat;
use crate::constants::DEFAULT_BUFFER_CAP;
use crate::output::record::{cell_text, prune_empty, Record};

/// Buffered output channel for one unit.
///
/// Rows are accumulated in memory and appended to the file whenever the
/// buffer grows past its cap, on explicit [`flush`](Self::flush), and on drop.
/// All methods take `&self`, so a sink can be shared through an `Arc` by a
/// unit's worker threads; the buffer mutex is held across the file write so
/// at most one flush is in flight.
pub struct RecordSink {
    name: String,
    path: PathBuf,
    headers: Option<Vec<String>>,
    format: OutputFormat,
    cap: usize,
    buffer: Mutex<Vec<Vec<Value>>>,
    written: AtomicUsize,
}

impl RecordSink {
    /// Open the sink at `{dir}/{prefix},{name}{run_id}.{ext}`.
    ///
    /// CSV output gets its header row immediately and JSON output starts as
    /// an empty file. Without headers nothing is created: the unit writes
    /// its own output at [`path`](Self::path).
    pub fn open(
        dir: &Path,
        prefix: &str,
        name: &str,
        run_id: &str,
        headers: Option<Vec<String>>,
        format: OutputFormat,
    ) -> Result<Self> {
        let path = dir.join(format!("{},{}{}.{}", prefix, name, run_id, format.extension()));

        if let Some(headers) = &headers {
            match format {
                OutputFormat::Csv => {
                    let mut writer = csv_writer(File::create(&path)
                        .context(format!("Failed to create {}", path.display()))?);
                    writer.write_record(headers)
                        .context(format!("Failed to write header to {}", path.display()))?;
                    writer.flush()?;
                }
                OutputFormat::Json => {
                    File::create(&path)
                        .context(format!("Failed to create {}", path.display()))?;
                }
            }
            debug!("Opened {} output at {}", name, path.display());
        }

        Ok(Self {
            name: name.to_string(),
            path,
            headers,
            format,
            cap: DEFAULT_BUFFER_CAP,
            buffer: Mutex::new(Vec::new()),
            written: AtomicUsize::new(0),
        })
    }

    /// Override the number of buffered rows that triggers a flush
    pub fn with_capacity(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Rows that reached the file so far
    pub fn records_written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    /// Queue one record, flushing if the buffer passed its cap
    pub fn write_record(&self, record: impl Into<Record>) {
        let Some(headers) = &self.headers else {
            debug!("{} is a pass-through sink, record dropped", self.name);
            return;
        };
        let row = record.into().into_row(headers);

        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push(row);
        if buffer.len() > self.cap {
            self.flush_locked(&mut buffer);
        }
    }

    /// Append every buffered row to the file.
    ///
    /// The buffer is emptied even when the write fails; the failure is logged.
    pub fn flush(&self) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        self.flush_locked(&mut buffer);
    }

    fn flush_locked(&self, buffer: &mut Vec<Vec<Value>>) {
        let rows = std::mem::take(buffer);
        if rows.is_empty() {
            return;
        }
        let Some(headers) = &self.headers else {
            return;
        };

        let result = match self.format {
            OutputFormat::Csv => self.append_csv(&rows),
            OutputFormat::Json => self.append_json(headers, &rows),
        };

        match result {
            Ok(()) => {
                self.written.fetch_add(rows.len(), Ordering::Relaxed);
            }
            Err(e) => error!("Failed to flush {} rows to {}: {:#}", rows.len(), self.path.display(), e),
        }
    }

    fn append_csv(&self, rows: &[Vec<Value>]) -> Result<()> {
        let mut writer = csv_writer(self.open_append()?);
        for row in rows {
            writer.write_record(row.iter().map(cell_text))
                .context(format!("Failed to write row to {}", self.path.display()))?;
        }
        let file = writer.into_inner().map_err(|e| anyhow!("{}", e.error()))?;
        file.sync_data()
            .context(format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }

    fn append_json(&self, headers: &[String], rows: &[Vec<Value>]) -> Result<()> {
        let mut writer = BufWriter::new(self.open_append()?);
        for row in rows {
            let mut object: Map<String, Value> = headers.iter().cloned().zip(row.iter().cloned()).collect();
            prune_empty(&mut object);
            serde_json::to_writer(&mut writer, &object)
                .context("Failed to serialize record")?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()
            .context(format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }

    fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(format!("Failed to open {} for append", self.path.display()))
    }
}

impl Drop for RecordSink {
    fn drop(&mut self) {
        self.flush();
    }
}

fn csv_writer(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(file)
}
