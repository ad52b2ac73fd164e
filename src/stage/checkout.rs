//! Source checkout stage - clone the application under the web root.

use anyhow::Result;
use std::path::PathBuf;

use super::{ApplyContext, ApplyOutcome, Stage, StageState};
use crate::config::LabConfig;
use crate::error::ProvisionError;
use crate::runner;

/// Ensures the application checkout exists inside the web root.
///
/// The clone is guarded: an existing checkout directory converges to
/// NoChange rather than failing the way a bare `git clone` into a
/// non-empty target would.
#[derive(Debug, Clone)]
pub struct Checkout {
    web_root: PathBuf,
    dir_name: String,
    repo_url: String,
}

impl Checkout {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            web_root: config.web_root_path(),
            dir_name: config.checkout_dir.clone(),
            repo_url: config.repo_url.clone(),
        }
    }

    fn target(&self) -> PathBuf {
        self.web_root.join(&self.dir_name)
    }

    fn clone_repo(&self) -> Result<()> {
        if !self.web_root.is_dir() {
            return Err(ProvisionError::MissingFile {
                path: self.web_root.clone(),
                hint: Some(
                    "the web root must exist before cloning; install the web server \
                     or point `web_root` at your document root"
                        .into(),
                ),
            }
            .into());
        }

        // Clone target is passed explicitly so the child's cwd is the only
        // directory that matters; the provisioner's own cwd never changes.
        runner::run_capture_in(&self.web_root, "git", &["clone", &self.repo_url, &self.dir_name])
            .map(|_| ())
    }
}

impl Stage for Checkout {
    fn name(&self) -> &'static str {
        "checkout"
    }

    fn description(&self) -> String {
        format!("Clone {} into {}", self.repo_url, self.target().display())
    }

    fn current_state(&self) -> Result<StageState> {
        if self.target().is_dir() {
            Ok(StageState::Present { details: None })
        } else {
            Ok(StageState::Absent)
        }
    }

    fn desired_state(&self) -> StageState {
        StageState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyOutcome> {
        if ctx.dry_run {
            return Ok(ApplyOutcome::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        if self.target().is_dir() {
            return Ok(ApplyOutcome::NoChange);
        }

        self.clone_repo()?;
        Ok(ApplyOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stage_in(root: &TempDir) -> Checkout {
        let config = LabConfig {
            web_root: root.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        Checkout::new(&config)
    }

    #[test]
    fn absent_when_checkout_missing() {
        let root = TempDir::new().unwrap();
        let stage = stage_in(&root);
        assert_eq!(stage.current_state().unwrap(), StageState::Absent);
        assert!(stage.needs_apply().unwrap());
    }

    #[test]
    fn present_when_checkout_exists() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("DVWA")).unwrap();
        let stage = stage_in(&root);
        assert!(!stage.needs_apply().unwrap());
    }

    #[test]
    fn apply_is_noop_for_existing_checkout() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("DVWA")).unwrap();
        let stage = stage_in(&root);
        let mut ctx = ApplyContext {
            dry_run: false,
            verbose: false,
        };
        // No git invocation happens here; the guard short-circuits.
        assert_eq!(stage.apply(&mut ctx).unwrap(), ApplyOutcome::NoChange);
    }

    #[test]
    fn dry_run_skips() {
        let root = TempDir::new().unwrap();
        let stage = stage_in(&root);
        let mut ctx = ApplyContext {
            dry_run: true,
            verbose: false,
        };
        assert!(matches!(
            stage.apply(&mut ctx).unwrap(),
            ApplyOutcome::Skipped { .. }
        ));
    }

    #[test]
    fn missing_web_root_is_a_missing_file_error() {
        let config = LabConfig {
            web_root: "/no/such/web/root".into(),
            ..Default::default()
        };
        let stage = Checkout::new(&config);
        let err = stage.clone_repo().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::MissingFile { .. })
        ));
    }
}
