//! Process spawning helpers.
//!
//! All external tools (git, mysql, service, php, chmod) are invoked through
//! these functions. Failures surface as [`ProvisionError::CommandFailed`]
//! with the full command line, exit status, and captured stderr. Working
//! directories are always passed explicitly; nothing here mutates the
//! process-wide current directory.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::ProvisionError;

fn display_command(cmd: &str, args: &[&str]) -> String {
    if args.is_empty() {
        cmd.to_string()
    } else {
        format!("{} {}", cmd, args.join(" "))
    }
}

fn check_output(cmd: &str, args: &[&str], output: std::process::Output) -> Result<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(ProvisionError::CommandFailed {
            command: display_command(cmd, args),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into())
    }
}

/// Run a command and capture its stdout, failing on non-zero exit.
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {}", display_command(cmd, args)))?;
    check_output(cmd, args, output)
}

/// Run a command from an explicit working directory, capturing output.
pub fn run_capture_in(dir: &Path, cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| {
            format!(
                "Failed to execute in {}: {}",
                dir.display(),
                display_command(cmd, args)
            )
        })?;
    check_output(cmd, args, output)
}

/// Run a command for its side effect, discarding stdout but failing with
/// captured stderr on non-zero exit.
pub fn run_checked(cmd: &str, args: &[&str]) -> Result<()> {
    run_capture(cmd, args).map(|_| ())
}

/// Run a command silently, returning success/failure.
pub fn run_quiet(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a command exists on PATH.
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionError;

    #[test]
    fn run_capture_trims_stdout() {
        let out = run_capture("echo", &["hello"]).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn run_capture_nonzero_is_command_failed() {
        let err = run_capture("false", &[]).unwrap_err();
        let err = err
            .downcast::<ProvisionError>()
            .expect("should be a ProvisionError");
        match err {
            ProvisionError::CommandFailed { command, .. } => assert_eq!(command, "false"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn run_capture_missing_binary_is_spawn_error() {
        let err = run_capture("vulnlab-no-such-binary-xyz", &[]).unwrap_err();
        // Spawn failures are not CommandFailed; the tool never ran.
        assert!(err.downcast_ref::<ProvisionError>().is_none());
    }

    #[test]
    fn run_capture_in_uses_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_capture_in(dir.path(), "pwd", &[]).unwrap();
        // Canonicalize both sides: the tempdir may sit behind a symlink.
        assert_eq!(
            std::fs::canonicalize(out).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn run_quiet_reports_status() {
        assert!(run_quiet("true", &[]));
        assert!(!run_quiet("false", &[]));
        assert!(!run_quiet("vulnlab-no-such-binary-xyz", &[]));
    }

    #[test]
    fn command_exists_finds_sh() {
        assert!(command_exists("sh"));
        assert!(!command_exists("vulnlab-no-such-binary-xyz"));
    }
}
