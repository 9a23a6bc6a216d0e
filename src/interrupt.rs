//! Cooperative cancellation on SIGINT.
//!
//! The handler only raises a process-wide flag. Units poll it through
//! [`RunContext::check_interrupt`](crate::models::RunContext::check_interrupt)
//! and stop with [`Interrupted`]. Polling claims the flag, so one Ctrl-C ends
//! only the unit that saw it; sibling units running on other workers carry
//! on. The orchestrator also clears the flag at unit boundaries so a signal
//! nobody polled does not leak into the next unit.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Result};
use thiserror::Error;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Error returned by a unit that stopped because of an interrupt
#[derive(Debug, Error)]
#[error("interrupted by user")]
pub struct Interrupted;

extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT to the interrupt flag instead of terminating the process
pub fn install_handler() -> Result<()> {
    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only performs an atomic store, which is async-signal-safe.
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        return Err(anyhow!("Failed to install SIGINT handler"));
    }
    Ok(())
}

/// Raise the flag as if SIGINT had been received
pub fn request() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn is_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Claim a pending interrupt, lowering the flag.
///
/// Returns `true` for exactly one caller per raised flag.
pub fn take() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Lower the flag without claiming it
pub fn clear() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}
