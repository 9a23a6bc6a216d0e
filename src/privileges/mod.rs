use anyhow::{anyhow, Result};
use log::{debug, info, warn};

/// Check if the process is running as root
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Get instructions for elevating privileges
pub fn get_elevation_instructions() -> &'static str {
    "Run with sudo: 'sudo ./mac-triage'"
}

/// Refuse to continue without root unless the user forces it
pub fn check_privileges(force: bool) -> Result<()> {
    if is_root() {
        info!("Running as root");
        return Ok(());
    }

    if force {
        warn!("Not running as root, some artifacts may be inaccessible");
        Ok(())
    } else {
        Err(anyhow!(
            "Root privileges are required to collect protected artifacts. {} or pass --force to continue anyway.",
            get_elevation_instructions()
        ))
    }
}

/// Lower the CPU priority of this process so collection yields to the host workload
pub fn lower_priority() {
    // nice() returns the new priority, which may legitimately be -1; errno tells failures apart
    let result = unsafe { libc::nice(19) };
    if result == -1 {
        warn!("Could not lower process priority: {}", std::io::Error::last_os_error());
    } else {
        debug!("Process priority lowered to {}", result);
    }
}
