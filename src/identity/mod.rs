//! Run identity: the run id and the naming prefix shared by every output.
//!
//! The prefix is `label,hostname,address,timestamp` with `:` and `/`
//! replaced so it can be used verbatim in file names. Host, address and
//! serial are resolved once per run and degrade to fixed sentinels when no
//! source answers.

mod host;
mod serial;

use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::config::CollectionOptions;
use crate::constants::{RUN_ID_LENGTH, SYSTEM_VERSION_PLIST, TIMESTAMP_FORMAT};
use crate::utils::command::capture_output;
use crate::utils::plist::read_string;

pub use host::{last_local_ip, parse_inet, resolve_address, resolve_hostname};
pub use serial::{query_serial, resolve_serial};

/// Identity of one collection run
#[derive(Debug, Clone, Serialize)]
pub struct RunIdentity {
    /// Empty when archiving is disabled, otherwise `-` and 10 alphanumerics
    pub run_id: String,
    pub prefix: String,
    pub hostname: String,
    pub address: String,
    pub serial: String,
    pub start_time: DateTime<Utc>,
}

impl RunIdentity {
    /// Assemble an identity from already resolved parts
    pub fn new(
        run_id: String,
        label: &str,
        hostname: String,
        address: String,
        serial: String,
        start_time: DateTime<Utc>,
    ) -> Self {
        let prefix = build_prefix(label, &hostname, &address, &format_timestamp(&start_time));
        Self {
            run_id,
            prefix,
            hostname,
            address,
            serial,
            start_time,
        }
    }

    /// Resolve host, address and serial for the configured input root.
    ///
    /// Never fails; unresolvable parts fall back to their sentinels.
    pub fn resolve(run_id: String, start_time: DateTime<Utc>, options: &CollectionOptions) -> Self {
        let live = options.is_live();
        let hostname = resolve_hostname(&options.input_dir, live);
        let address = resolve_address(&options.input_dir, live);
        let serial = resolve_serial(&options.input_dir, &options.output_dir);
        debug!("Resolved host={} address={} serial={}", hostname, address, serial);

        let identity = Self::new(run_id, &options.prefix, hostname, address, serial, start_time);
        info!("Output prefix: {}", identity.prefix);
        identity
    }

    /// Start time in the record timestamp format
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.start_time)
    }
}

/// Generate the run id appended to every output of this run
pub fn generate_run_id(archiving: bool) -> String {
    if !archiving {
        return String::new();
    }
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RUN_ID_LENGTH)
        .map(char::from)
        .collect();
    format!("-{}", suffix)
}

/// Join the prefix parts and make the result safe for file names
pub fn build_prefix(label: &str, hostname: &str, address: &str, timestamp: &str) -> String {
    format!("{},{},{},{}", label, hostname, address, timestamp)
        .replace([':', '/'], "_")
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// macOS product version of the input root.
///
/// The system volume of a split image is consulted when the input root has
/// no `SystemVersion.plist`; `sw_vers` is the last resort on a live system.
pub fn detect_os_version(input_root: &Path, system_root: Option<&Path>, live: bool) -> Option<String> {
    let from_plist = |root: &Path| read_string(&root.join(SYSTEM_VERSION_PLIST), "ProductVersion");

    from_plist(input_root).or_else(|| system_root.and_then(from_plist)).or_else(|| {
        if live {
            capture_output("sw_vers", &["-productVersion"])
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}
