use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CollectionOptions, HashAlgorithm, OutputFormat};

/// Command-line arguments for mac-triage.
///
/// Every option left unset keeps the value from the configuration file
/// (or the built-in default when no file is given).
#[derive(Parser, Debug)]
#[clap(name = "mac-triage", about = "macOS forensic triage collector", version)]
pub struct Args {
    /// Units to run (`all`, `live`, or names); space or comma separated
    #[clap(short = 'm', long = "include-modules", num_args = 1.., value_delimiter = ',')]
    pub include_modules: Vec<String>,

    /// Run every unit except these
    #[clap(short = 'x', long = "exclude-modules", num_args = 1.., value_delimiter = ',')]
    pub exclude_modules: Vec<String>,

    /// List available units and exit
    #[clap(short = 'l', long)]
    pub list_modules: bool,

    /// Root of the system to collect from (default: /)
    #[clap(short = 'i', long = "inputdir")]
    pub input_dir: Option<PathBuf>,

    /// System volume of a 10.15+ image when --inputdir is its Data volume
    #[clap(long = "inputsysdir")]
    pub input_sys_dir: Option<PathBuf>,

    /// Directory for outputs, the archive and the log (default: ./)
    #[clap(short = 'o', long = "outputdir")]
    pub output_dir: Option<PathBuf>,

    /// Label placed at the start of every output name
    #[clap(short, long)]
    pub prefix: Option<String>,

    /// Treat the input directory as a mounted image
    #[clap(short = 'f', long)]
    pub forensic_mode: bool,

    /// Proceed even if the input directory does not look like a mounted volume
    #[clap(short = 'O', long)]
    pub override_mount: bool,

    /// Leave outputs in the output directory instead of archiving them
    #[clap(long)]
    pub no_tarball: bool,

    /// Do not write a runtime log file
    #[clap(long)]
    pub no_logfile: bool,

    /// Output file format
    #[clap(long, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Keep the normal CPU priority
    #[clap(long)]
    pub no_low_priority: bool,

    /// Run units in parallel
    #[clap(short = 'b', long)]
    pub multiprocessing: bool,

    /// Worker threads for parallel runs (default: number of CPUs)
    #[clap(long)]
    pub workers: Option<usize>,

    /// Only log warnings and errors to the terminal
    #[clap(short, long)]
    pub quiet: bool,

    /// Debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Continue even without root privileges
    #[clap(long)]
    pub force: bool,

    #[clap(flatten)]
    pub dirlist: DirListArgs,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Options for the directory listing unit.
#[derive(ClapArgs, Debug, Default)]
pub struct DirListArgs {
    /// Directories to list, relative to the input directory
    #[clap(long = "dir-include-dirs", num_args = 1.., value_delimiter = ',')]
    pub include_dirs: Vec<String>,

    /// Directories to skip; `no-defaults` disables the built-in exclusions
    #[clap(long = "dir-exclude-dirs", num_args = 1.., value_delimiter = ',')]
    pub exclude_dirs: Vec<String>,

    /// Hash to compute for regular files
    #[clap(long = "dir-hash-alg", value_enum)]
    pub hash_alg: Option<HashAlgorithm>,

    /// Largest file to hash, in MB
    #[clap(long = "dir-hash-size-limit")]
    pub hash_size_limit: Option<u64>,

    /// Descend into application and framework bundles
    #[clap(long = "dir-recurse-bundles")]
    pub recurse_bundles: bool,

    /// List on a single thread
    #[clap(long = "dir-no-multithreading")]
    pub no_multithreading: bool,
}

/// Available subcommands for the collector.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "config.yaml")]
        path: PathBuf,
    },
}

impl Args {
    /// Apply the flags given on the command line on top of loaded options
    pub fn apply_to(&self, options: &mut CollectionOptions) {
        if !self.include_modules.is_empty() {
            options.include_units = self.include_modules.clone();
        }
        if !self.exclude_modules.is_empty() {
            options.exclude_units = self.exclude_modules.clone();
        }
        if let Some(dir) = &self.input_dir {
            options.input_dir = dir.clone();
        }
        if let Some(dir) = &self.input_sys_dir {
            options.input_sys_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.output_dir {
            options.output_dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            options.prefix = prefix.clone();
        }
        if let Some(format) = self.output_format {
            options.output_format = format;
        }
        if let Some(workers) = self.workers {
            options.workers = workers.max(1);
        }

        options.forensic_mode |= self.forensic_mode;
        options.override_mount |= self.override_mount;
        options.no_tarball |= self.no_tarball;
        options.no_logfile |= self.no_logfile;
        options.parallel |= self.multiprocessing;
        if self.no_low_priority {
            options.low_priority = false;
        }

        let dirlist = &mut options.dirlist;
        if !self.dirlist.include_dirs.is_empty() {
            dirlist.include_dirs = self.dirlist.include_dirs.clone();
        }
        if !self.dirlist.exclude_dirs.is_empty() {
            dirlist.exclude_dirs = self.dirlist.exclude_dirs.clone();
        }
        if let Some(alg) = self.dirlist.hash_alg {
            dirlist.hash_algorithm = alg;
        }
        if let Some(limit) = self.dirlist.hash_size_limit {
            dirlist.hash_size_limit_mb = limit;
        }
        dirlist.recurse_bundles |= self.dirlist.recurse_bundles;
        if self.dirlist.no_multithreading {
            dirlist.multithreading = false;
        }
    }
}
