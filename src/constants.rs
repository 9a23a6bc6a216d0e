//! Global constants for the mac_triage application.
//!
//! This module centralizes hardcoded paths, sentinels and limits so that the
//! identity resolvers, the output layer and the units agree on them.

// Output constants
/// Number of buffered rows that triggers a sink flush
pub const DEFAULT_BUFFER_CAP: usize = 10_000;

/// Default label placed first in the naming prefix
pub const DEFAULT_PREFIX_LABEL: &str = "mac-triage-output";

/// Size of the two zero blocks that terminate a tar stream
pub const TAR_END_MARKER_SIZE: u64 = 1024;

/// Buffer size used when streaming the tar into gzip (1MB)
pub const ARCHIVE_COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Length of the random run id, excluding the leading dash
pub const RUN_ID_LENGTH: usize = 10;

// Identity sentinels
/// Hostname placeholder when no source yields a name
pub const HOSTNAME_ERROR: &str = "HNERROR";

/// Address placeholder when no source yields an address
pub const ADDRESS_UNKNOWN: &str = "255.255.255.255";

/// Serial placeholder when no cache database answers
pub const SERIAL_ERROR: &str = "SERIALERROR";

/// Timestamp format used for the prefix and every record time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// Paths relative to the input root
/// System configuration preferences holding the host names
pub const PREFERENCES_PLIST: &str = "Library/Preferences/SystemConfiguration/preferences.plist";

/// Global preferences holding the last selected time zone city
pub const GLOBAL_PREFERENCES_PLIST: &str = "Library/Preferences/.GlobalPreferences.plist";

/// Product version information
pub const SYSTEM_VERSION_PLIST: &str = "System/Library/CoreServices/SystemVersion.plist";

/// Wi-Fi log scanned for the last leased address on images
pub const WIFI_LOG: &str = "private/var/log/wifi.log";

/// Cache folder holding databases that record the hardware serial
pub const SERIAL_DB_DIR: &str = "private/var/folders/zz/zyxvpxvq6csfxvn_n00000sm00006d/C";

/// File name suffixes of serial-bearing databases
pub const SERIAL_DB_SUFFIXES: &[&str] = &[
    "consolidated.db",
    "cache_encryptedA.db",
    "lockCache_encryptedA.db",
];

/// Query returning the serial number
pub const SERIAL_QUERY: &str = "SELECT SerialNumber FROM TableInfo;";

/// Suffix appended to scratch copies of locked databases
pub const SCRATCH_DB_SUFFIX: &str = "-tmp_triage";

/// Directories that must exist under a mounted image root
pub const REQUIRED_MOUNT_DIRS: &[&str] = &["Library", "System", "Users", "Applications"];

/// Home directory of the root user, relative to the input root
pub const ROOT_HOME: &str = "var/root";

// Directory listing
/// Bundle extensions whose contents are not descended into by default
pub const BUNDLE_EXTENSIONS: &[&str] = &[
    "app", "framework", "lproj", "plugin", "kext", "osax", "bundle", "driver", "wdgt",
];

/// Directories always skipped by the directory listing
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".fseventsd",
    ".DocumentRevisions-V100",
    ".Spotlight-V100",
];

/// Additional exclusions applied when walking a live system
pub const LIVE_EXCLUDED_DIRS: &[&str] = &[
    "Users/*/Pictures",
    "Users/*/Library/Application Support/AddressBook",
    "Users/*/Calendar",
    "Users/*/Library/Calendars",
    "Users/*/Library/Preferences/com.apple.AddressBook.plist",
    "Volumes",
];

/// Token that disables the default exclusions
pub const NO_DEFAULT_EXCLUDES: &str = "no-defaults";

/// Default hash size limit for the directory listing (MB)
pub const DEFAULT_HASH_SIZE_LIMIT_MB: u64 = 10;

/// Default number of directory listing workers
pub const DEFAULT_DIRLIST_WORKERS: usize = 4;

/// Capacity of the directory listing work queue
pub const DIRLIST_QUEUE_CAPACITY: usize = 1024;
