use std::process::Command;

use anyhow::{anyhow, Context, Result};
use log::debug;

/// Run a program and return its standard output as text.
///
/// A non-zero exit status is an error carrying the program's stderr.
pub fn capture_output(program: &str, args: &[&str]) -> Result<String> {
    debug!("Executing {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .context(format!("Failed to execute {} command", program))?;

    if !output.status.success() {
        return Err(anyhow!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_echo() {
        let out = capture_output("echo", &["hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_failing_command() {
        assert!(capture_output("false", &[]).is_err());
    }

    #[test]
    fn test_missing_program() {
        assert!(capture_output("definitely-not-a-real-program", &[]).is_err());
    }
}
