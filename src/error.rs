//! Failure taxonomy for provisioning runs.
//!
//! Every way a run can fail on purpose is one of these variants; anything
//! else propagates as a plain `anyhow::Error`. Variants carry the context
//! an operator needs to act (the command line, the exit status, the
//! captured stderr, the install hint) instead of a bare message.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A required external tool is not installed or not on PATH.
    #[error("{tool} is not installed")]
    MissingTool {
        tool: String,
        /// Platform-specific install instructions, one per line.
        hint: String,
    },

    /// A spawned command exited with a non-zero status.
    #[error("command `{command}` failed ({status})")]
    CommandFailed {
        /// Full command line as invoked.
        command: String,
        /// Exit status, or "terminated by signal" when there is none.
        status: String,
        /// Captured stderr, empty when stdio was inherited.
        stderr: String,
    },

    /// A file a stage depends on does not exist.
    #[error("required file not found: {}", path.display())]
    MissingFile {
        path: PathBuf,
        /// What the operator should check, when we can tell.
        hint: Option<String>,
    },
}

impl ProvisionError {
    /// Operator-facing detail lines beyond the one-line summary.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::MissingTool { hint, .. } => Some(hint.clone()),
            Self::CommandFailed { stderr, .. } => {
                if stderr.is_empty() {
                    None
                } else {
                    Some(stderr.clone())
                }
            }
            Self::MissingFile { hint, .. } => hint.clone(),
        }
    }
}
