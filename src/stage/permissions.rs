//! Tree permissions stage - make the checkout world-writable.
//!
//! `chmod -R 777` is deliberate and wildly insecure: DVWA is an
//! intentionally vulnerable training target and several of its exercises
//! write inside their own tree. Never point this tool at a production
//! document root.

use anyhow::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use super::{ApplyContext, ApplyOutcome, Stage, StageState};
use crate::config::LabConfig;
use crate::error::ProvisionError;
use crate::runner;

const WORLD_WRITABLE: u32 = 0o777;

#[derive(Debug, Clone)]
pub struct TreePermissions {
    path: PathBuf,
}

impl TreePermissions {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            path: config.checkout_path(),
        }
    }

    /// Mode bits of the checkout root, the cheap proxy for the whole tree.
    fn root_mode(&self) -> Result<u32> {
        let meta = fs::metadata(&self.path).map_err(|_| ProvisionError::MissingFile {
            path: self.path.clone(),
            hint: Some("run the checkout stage first".into()),
        })?;
        Ok(meta.permissions().mode() & 0o777)
    }
}

impl Stage for TreePermissions {
    fn name(&self) -> &'static str {
        "permissions"
    }

    fn description(&self) -> String {
        format!("Set mode 777 recursively on {}", self.path.display())
    }

    fn current_state(&self) -> Result<StageState> {
        match self.root_mode() {
            Ok(WORLD_WRITABLE) => Ok(StageState::Present {
                details: Some("777".into()),
            }),
            Ok(mode) => Ok(StageState::Modified {
                from: format!("{mode:o}"),
                to: "777".into(),
            }),
            // Checkout not cloned yet; nothing to measure.
            Err(_) => Ok(StageState::Absent),
        }
    }

    fn desired_state(&self) -> StageState {
        StageState::Present {
            details: Some("777".into()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyOutcome> {
        if ctx.dry_run {
            return Ok(ApplyOutcome::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        if self.root_mode()? == WORLD_WRITABLE {
            return Ok(ApplyOutcome::NoChange);
        }

        let path = self.path.to_string_lossy();
        runner::run_checked("chmod", &["-R", "777", &path])?;
        Ok(ApplyOutcome::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stage_for(root: &TempDir) -> TreePermissions {
        let config = LabConfig {
            web_root: root.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        TreePermissions::new(&config)
    }

    #[test]
    fn absent_when_checkout_missing() {
        let root = TempDir::new().unwrap();
        let stage = stage_for(&root);
        assert_eq!(stage.current_state().unwrap(), StageState::Absent);
    }

    #[test]
    fn modified_when_mode_is_restrictive() {
        let root = TempDir::new().unwrap();
        let checkout = root.path().join("DVWA");
        fs::create_dir(&checkout).unwrap();
        fs::set_permissions(&checkout, fs::Permissions::from_mode(0o755)).unwrap();

        let stage = stage_for(&root);
        match stage.current_state().unwrap() {
            StageState::Modified { from, to } => {
                assert_eq!(from, "755");
                assert_eq!(to, "777");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn apply_relaxes_the_tree() {
        let root = TempDir::new().unwrap();
        let checkout = root.path().join("DVWA");
        fs::create_dir(&checkout).unwrap();
        fs::write(checkout.join("index.php"), "<?php ?>").unwrap();
        fs::set_permissions(&checkout, fs::Permissions::from_mode(0o755)).unwrap();

        let stage = stage_for(&root);
        let mut ctx = ApplyContext {
            dry_run: false,
            verbose: false,
        };
        assert_eq!(stage.apply(&mut ctx).unwrap(), ApplyOutcome::Modified);

        let mode = fs::metadata(&checkout).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o777);
        let file_mode =
            fs::metadata(checkout.join("index.php")).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o777);

        // Second apply converges without touching anything.
        assert_eq!(stage.apply(&mut ctx).unwrap(), ApplyOutcome::NoChange);
    }
}
