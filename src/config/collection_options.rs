use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BUFFER_CAP, DEFAULT_DIRLIST_WORKERS, DEFAULT_HASH_SIZE_LIMIT_MB, DEFAULT_PREFIX_LABEL,
    REQUIRED_MOUNT_DIRS,
};

/// Serialization format of unit output files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma separated values with a header row
    Csv,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    /// File extension used for output files of this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Hash computed for regular files by the directory listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    None,
}

/// Options consumed by the directory listing unit.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DirListOptions {
    /// Directories to walk, relative to the input root (empty walks the root)
    pub include_dirs: Vec<String>,
    /// Extra exclusions; the single entry `no-defaults` disables the defaults
    pub exclude_dirs: Vec<String>,
    pub hash_algorithm: HashAlgorithm,
    pub hash_size_limit_mb: u64,
    pub recurse_bundles: bool,
    pub multithreading: bool,
    pub workers: usize,
}

impl Default for DirListOptions {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            exclude_dirs: Vec::new(),
            hash_algorithm: HashAlgorithm::Sha256,
            hash_size_limit_mb: DEFAULT_HASH_SIZE_LIMIT_MB,
            recurse_bundles: false,
            multithreading: true,
            workers: DEFAULT_DIRLIST_WORKERS,
        }
    }
}

/// Options that shape a collection run.
///
/// Loaded from an optional YAML file first; command-line flags are applied
/// on top by the binary. Every unit reads them through the shared run
/// context and never mutates them.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionOptions {
    /// Root of the live file system or of a mounted image
    pub input_dir: PathBuf,
    /// System volume of a split 10.15+ image, when `input_dir` is the data volume
    pub input_sys_dir: Option<PathBuf>,
    /// Scratch directory for outputs, the archive and the log
    pub output_dir: PathBuf,
    /// Label placed first in the naming prefix
    pub prefix: String,
    pub forensic_mode: bool,
    /// Continue when a forensic input root lacks the expected directories
    pub override_mount: bool,
    /// Leave unit outputs loose instead of building an archive
    pub no_tarball: bool,
    pub no_logfile: bool,
    pub output_format: OutputFormat,
    /// Lower the process CPU priority before collecting
    pub low_priority: bool,
    /// Run units on a worker pool instead of one at a time
    pub parallel: bool,
    pub workers: usize,
    pub buffer_cap: usize,
    pub include_units: Vec<String>,
    pub exclude_units: Vec<String>,
    pub dirlist: DirListOptions,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("/"),
            input_sys_dir: None,
            output_dir: PathBuf::from("./"),
            prefix: DEFAULT_PREFIX_LABEL.to_string(),
            forensic_mode: false,
            override_mount: false,
            no_tarball: false,
            no_logfile: false,
            output_format: OutputFormat::Csv,
            low_priority: true,
            parallel: false,
            workers: num_cpus::get(),
            buffer_cap: DEFAULT_BUFFER_CAP,
            include_units: Vec::new(),
            exclude_units: Vec::new(),
            dirlist: DirListOptions::default(),
        }
    }
}

impl CollectionOptions {
    /// Load options from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let options: CollectionOptions = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(options)
    }

    /// Save options to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        CollectionOptions::default().save_to_yaml_file(path)
    }

    /// Whether the input root is the running system rather than an image.
    ///
    /// Anything under `Volumes` is treated as a mounted image even without
    /// forensic mode.
    pub fn is_live(&self) -> bool {
        !self.forensic_mode && !self.input_dir.to_string_lossy().contains("Volumes")
    }

    /// Archiving is on unless explicitly disabled
    pub fn archiving(&self) -> bool {
        !self.no_tarball
    }

    /// Verify that a forensic input root looks like a mounted macOS volume
    pub fn check_forensic_mount(&self) -> Result<()> {
        if !self.forensic_mode {
            return Ok(());
        }

        let missing: Vec<&str> = REQUIRED_MOUNT_DIRS
            .iter()
            .copied()
            .filter(|dir| !self.input_dir.join(dir).is_dir())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else if self.override_mount {
            warn!("Input directory {} is missing {}, continuing anyway",
                  self.input_dir.display(), missing.join(", "));
            Ok(())
        } else {
            Err(anyhow!(
                "Input directory {} does not look like a mounted volume (missing: {}). \
                 Mount the image and point --inputdir at its root, or pass --override-mount.",
                self.input_dir.display(),
                missing.join(", ")
            ))
        }
    }
}

/// Load options from a file if given, otherwise fall back to defaults.
///
/// A path that does not exist yet is populated with the defaults so the
/// user has a template to edit.
pub fn load_or_default(config_path: Option<&Path>) -> Result<CollectionOptions> {
    match config_path {
        Some(path) if path.exists() => CollectionOptions::from_yaml_file(path),
        Some(path) => {
            info!("Config {} not found, writing defaults there", path.display());
            let options = CollectionOptions::default();
            options.save_to_yaml_file(path)?;
            Ok(options)
        }
        None => {
            debug!("No config path provided, using default options");
            Ok(CollectionOptions::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_serialization_deserialization() {
        let mut options = CollectionOptions::default();
        options.output_format = OutputFormat::Json;
        options.include_units = vec!["bash".to_string(), "live".to_string()];

        let yaml = serde_yaml::to_string(&options).unwrap();
        assert!(yaml.contains("output_format: json"));

        let loaded: CollectionOptions = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(loaded.output_format, OutputFormat::Json);
        assert_eq!(loaded.include_units, vec!["bash", "live"]);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let loaded: CollectionOptions = serde_yaml::from_str("parallel: true\n").unwrap();
        assert!(loaded.parallel);
        assert_eq!(loaded.buffer_cap, DEFAULT_BUFFER_CAP);
        assert_eq!(loaded.dirlist.hash_size_limit_mb, DEFAULT_HASH_SIZE_LIMIT_MB);
        assert_eq!(loaded.prefix, DEFAULT_PREFIX_LABEL);
    }

    #[test]
    fn test_save_and_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.yaml");

        let mut options = CollectionOptions::default();
        options.prefix = "case42".to_string();
        options.save_to_yaml_file(&path).unwrap();

        let loaded = CollectionOptions::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.prefix, "case42");
    }

    #[test]
    fn test_load_or_default_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("new.yaml");

        let options = load_or_default(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(options.prefix, DEFAULT_PREFIX_LABEL);
    }

    #[test]
    fn test_is_live() {
        let mut options = CollectionOptions::default();
        assert!(options.is_live());

        options.input_dir = PathBuf::from("/Volumes/evidence");
        assert!(!options.is_live());

        options.input_dir = PathBuf::from("/mnt/image");
        options.forensic_mode = true;
        assert!(!options.is_live());
    }

    #[test]
    fn test_forensic_mount_check() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = CollectionOptions::default();
        options.input_dir = temp_dir.path().to_path_buf();
        options.forensic_mode = true;

        let err = options.check_forensic_mount().unwrap_err();
        assert!(err.to_string().contains("Library"));

        for dir in REQUIRED_MOUNT_DIRS {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        assert!(options.check_forensic_mount().is_ok());
    }

    #[test]
    fn test_forensic_mount_accepts_data_volume_layout() {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["Library", "System", "Users", "Applications"] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        let options = CollectionOptions {
            input_dir: temp_dir.path().to_path_buf(),
            forensic_mode: true,
            ..CollectionOptions::default()
        };

        assert!(options.check_forensic_mount().is_ok());
    }

    #[test]
    fn test_forensic_mount_override() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = CollectionOptions {
            input_dir: temp_dir.path().to_path_buf(),
            forensic_mode: true,
            ..CollectionOptions::default()
        };
        assert!(options.check_forensic_mount().is_err());

        options.override_mount = true;
        assert!(options.check_forensic_mount().is_ok());
    }
}
