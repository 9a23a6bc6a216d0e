//! Recursive file listing with metadata and content hashes.
//!
//! The walk runs on the unit's thread and feeds paths through a bounded
//! channel to a small worker pool. Workers stat and hash each path and write
//! into one shared sink, which serializes them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::{DirListOptions, HashAlgorithm};
use crate::constants::{
    BUNDLE_EXTENSIONS, DEFAULT_EXCLUDED_DIRS, DIRLIST_QUEUE_CAPACITY, LIVE_EXCLUDED_DIRS,
    NO_DEFAULT_EXCLUDES,
};
use crate::models::RunContext;
use crate::output::{Record, RecordSink};
use crate::units::{CollectionUnit, UnitDescriptor};
use crate::utils::hash::calculate_sha256;
use crate::utils::stat::{stat_path, FileStat};

pub const DESCRIPTOR: UnitDescriptor = UnitDescriptor {
    name: "dirlist",
    version: "1.0.1",
    live_only: false,
    description: "File system listing with stat data and SHA-256 hashes",
    factory: create,
};

const HEADERS: &[&str] = &[
    "mode", "size", "uid", "gid", "mtime", "atime", "ctime", "btime", "path", "name", "sha256",
];

fn create(ctx: Arc<RunContext>) -> Box<dyn CollectionUnit> {
    Box::new(DirListUnit { ctx })
}

#[derive(Serialize)]
struct EntryRecord {
    #[serde(flatten)]
    stat: FileStat,
    sha256: String,
}

/// Paths that the walk must not enter, relative to the input root
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    /// Build the exclusions for a walk.
    ///
    /// Defaults apply unless the user list is exactly `no-defaults`; live
    /// walks additionally skip personal media and mounted volumes.
    pub fn new(options: &DirListOptions, live: bool) -> Self {
        let no_defaults = options.exclude_dirs.len() == 1 && options.exclude_dirs[0] == NO_DEFAULT_EXCLUDES;

        let mut globs: Vec<&str> = Vec::new();
        if !no_defaults {
            globs.extend(DEFAULT_EXCLUDED_DIRS);
            if live {
                globs.extend(LIVE_EXCLUDED_DIRS);
            }
            globs.extend(options.exclude_dirs.iter().map(String::as_str));
        }

        let patterns = globs.into_iter().filter_map(glob_to_regex).collect();
        Self { patterns }
    }

    pub fn is_excluded(&self, relative: &str) -> bool {
        let relative = relative.trim_matches('/');
        self.patterns.iter().any(|re| re.is_match(relative))
    }
}

fn glob_to_regex(glob: &str) -> Option<Regex> {
    let glob = glob.trim_matches('/');
    if glob.is_empty() {
        return None;
    }
    let escaped = regex::escape(glob).replace(r"\*", "[^/]*");
    Regex::new(&format!("^{}$", escaped))
        .map_err(|e| warn!("Ignoring exclusion {}: {}", glob, e))
        .ok()
}

fn is_bundle(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| BUNDLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

pub struct DirListUnit {
    ctx: Arc<RunContext>,
}

impl DirListUnit {
    fn roots(&self) -> Vec<PathBuf> {
        let input = self.ctx.input_root();
        let include = &self.ctx.options.dirlist.include_dirs;
        if include.is_empty() {
            vec![input.to_path_buf()]
        } else {
            include
                .iter()
                .map(|dir| input.join(dir.trim_start_matches('/')))
                .collect()
        }
    }

    /// Walk every root, sending entries to the workers
    fn walk(&self, sender: &Sender<PathBuf>, exclusions: &ExclusionSet) -> Result<usize> {
        let input = self.ctx.input_root();
        let recurse_bundles = self.ctx.options.dirlist.recurse_bundles;
        let mut queued = 0;

        for root in self.roots() {
            let mut entries = WalkDir::new(&root).follow_links(false).into_iter();
            while let Some(entry) = entries.next() {
                self.ctx.check_interrupt()?;

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                };
                let path = entry.path();
                let is_dir = entry.file_type().is_dir();

                let relative = path.strip_prefix(input).unwrap_or(path).to_string_lossy();
                if exclusions.is_excluded(&relative) {
                    if is_dir {
                        entries.skip_current_dir();
                    }
                    continue;
                }

                sender
                    .send(path.to_path_buf())
                    .map_err(|_| anyhow!("Directory listing workers stopped early"))?;
                queued += 1;

                if is_dir && entry.depth() > 0 && !recurse_bundles && is_bundle(path) {
                    entries.skip_current_dir();
                }
            }
        }

        Ok(queued)
    }
}

fn listing_worker(receiver: Receiver<PathBuf>, sink: &RecordSink, options: &DirListOptions) {
    while let Ok(path) = receiver.recv() {
        let stat = stat_path(&path);

        let sha256 = if options.hash_algorithm == HashAlgorithm::Sha256 && stat.mode == "Regular File" {
            match calculate_sha256(&path, options.hash_size_limit_mb) {
                Ok(Some(hash)) => hash,
                Ok(None) => String::new(),
                Err(e) => {
                    debug!("Could not hash {}: {}", path.display(), e);
                    "ERROR".to_string()
                }
            }
        } else {
            String::new()
        };

        match Record::from_serialize(&EntryRecord { stat, sha256 }) {
            Ok(record) => sink.write_record(record),
            Err(e) => warn!("Could not encode entry {}: {}", path.display(), e),
        }
    }
}

impl CollectionUnit for DirListUnit {
    fn run(&mut self) -> Result<()> {
        let start = Instant::now();
        let options = &self.ctx.options.dirlist;
        let sink = self.ctx.open_sink(DESCRIPTOR.name, HEADERS)?;
        let exclusions = ExclusionSet::new(options, self.ctx.is_live());

        let workers = if options.multithreading { options.workers.max(1) } else { 1 };
        let (sender, receiver) = bounded::<PathBuf>(DIRLIST_QUEUE_CAPACITY);

        let walked = crossbeam::scope(|scope| {
            for _ in 0..workers {
                let receiver = receiver.clone();
                let sink = &sink;
                scope.spawn(move |_| listing_worker(receiver, sink, options));
            }
            drop(receiver);

            let result = self.walk(&sender, &exclusions);
            // Closing the channel lets the workers drain and exit
            drop(sender);
            result
        })
        .map_err(|_| anyhow!("A directory listing worker panicked"))?;

        sink.flush();
        let queued = walked?;
        info!(
            "Listed {} entries ({} records) in {:.2?} with {} workers",
            queued,
            sink.records_written(),
            start.elapsed(),
            workers
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exclusions() {
        let set = ExclusionSet::new(&DirListOptions::default(), false);
        assert!(set.is_excluded(".fseventsd"));
        assert!(set.is_excluded("/.Spotlight-V100/"));
        assert!(!set.is_excluded("Users"));
        assert!(!set.is_excluded("Users/alice/Pictures"));
    }

    #[test]
    fn test_live_exclusions_use_wildcards() {
        let set = ExclusionSet::new(&DirListOptions::default(), true);
        assert!(set.is_excluded("Users/alice/Pictures"));
        assert!(!set.is_excluded("Users/alice/Pictures/inner"));
        assert!(set.is_excluded("Volumes"));
    }

    #[test]
    fn test_no_defaults() {
        let options = DirListOptions {
            exclude_dirs: vec![NO_DEFAULT_EXCLUDES.to_string()],
            ..DirListOptions::default()
        };
        let set = ExclusionSet::new(&options, true);
        assert!(!set.is_excluded(".fseventsd"));
    }

    #[test]
    fn test_user_exclusions_extend_defaults() {
        let options = DirListOptions {
            exclude_dirs: vec!["private/var/vm".to_string()],
            ..DirListOptions::default()
        };
        let set = ExclusionSet::new(&options, false);
        assert!(set.is_excluded("private/var/vm"));
        assert!(set.is_excluded(".fseventsd"));
    }

    #[test]
    fn test_bundle_detection() {
        assert!(is_bundle(Path::new("/Applications/Safari.app")));
        assert!(is_bundle(Path::new("/Library/Extensions/x.kext")));
        assert!(!is_bundle(Path::new("/Users/alice/notes.txt")));
    }
}
