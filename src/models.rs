use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::CollectionOptions;
use crate::constants::ROOT_HOME;
use crate::identity::RunIdentity;
use crate::interrupt::{self, Interrupted};
use crate::output::RecordSink;

/// Everything a unit may read about the current run.
///
/// Built once before orchestration and shared through an `Arc`; nothing in
/// it changes while units run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub options: CollectionOptions,
    pub identity: RunIdentity,
    pub os_version: Option<String>,
}

/// A home directory found under the input root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHome {
    pub user: String,
    pub path: PathBuf,
}

impl RunContext {
    pub fn new(options: CollectionOptions, identity: RunIdentity, os_version: Option<String>) -> Self {
        Self { options, identity, os_version }
    }

    pub fn is_live(&self) -> bool {
        self.options.is_live()
    }

    pub fn input_root(&self) -> &Path {
        &self.options.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.options.output_dir
    }

    /// Open a record sink for a unit using the run's prefix, run id and format
    pub fn open_sink(&self, name: &str, headers: &[&str]) -> Result<RecordSink> {
        let headers = headers.iter().map(|h| h.to_string()).collect();
        let sink = RecordSink::open(
            &self.options.output_dir,
            &self.identity.prefix,
            name,
            &self.identity.run_id,
            Some(headers),
            self.options.output_format,
        )?;
        Ok(sink.with_capacity(self.options.buffer_cap))
    }

    /// Fail with [`Interrupted`] once the user asked to stop.
    ///
    /// The first caller to see a pending interrupt claims it, so units on
    /// other workers keep running.
    pub fn check_interrupt(&self) -> Result<()> {
        if interrupt::take() {
            Err(Interrupted.into())
        } else {
            Ok(())
        }
    }

    /// Every `Users/*` directory plus the root user's home, in name order
    pub fn user_homes(&self) -> Vec<UserHome> {
        let mut homes: Vec<UserHome> = fs::read_dir(self.input_root().join("Users"))
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.path().is_dir())
                    .map(|entry| UserHome {
                        user: entry.file_name().to_string_lossy().into_owned(),
                        path: entry.path(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        homes.sort_by(|a, b| a.user.cmp(&b.user));

        homes.push(UserHome {
            user: "root".to_string(),
            path: self.input_root().join(ROOT_HOME),
        });
        homes
    }
}
