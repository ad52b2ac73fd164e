//! Application config stage - materialize and patch `config.inc.php`.
//!
//! The live config is copied from the shipped `.dist` template once, then
//! four assignment lines are rewritten in place: database user, database
//! password, and the two reCAPTCHA keys. Each substitution matches
//! `$_DVWA['key'] = '<anything>';` so reapplying it to an already-patched
//! file is a no-op.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::PathBuf;

use super::{ApplyContext, ApplyOutcome, Stage, StageState};
use crate::config::LabConfig;
use crate::error::ProvisionError;

const CONFIG_FILE: &str = "config.inc.php";
const TEMPLATE_FILE: &str = "config.inc.php.dist";

/// Rewrite the value of one `$_DVWA['key'] = '...';` assignment.
///
/// Matches regardless of the current value and preserves the key and
/// statement syntax. Returns the content unchanged when the key is absent.
pub fn substitute(content: &str, key: &str, value: &str) -> Result<String> {
    let pattern = format!(r"\$_DVWA\[\s*'{}'\s*\]\s*=\s*'[^']*';", regex::escape(key));
    let re = Regex::new(&pattern).context("invalid substitution pattern")?;
    let replacement = format!("$_DVWA[ '{key}' ] = '{value}';");
    // NoExpand: the replacement itself starts with `$_`, which the regex
    // crate would otherwise treat as a capture-group reference.
    Ok(re
        .replace_all(content, regex::NoExpand(&replacement))
        .into_owned())
}

/// Apply all four lab substitutions to the config file content.
pub fn patch_values(content: &str, config: &LabConfig) -> Result<String> {
    let mut out = content.to_string();
    for (key, value) in [
        ("db_user", config.db_user.as_str()),
        ("db_password", config.db_password.as_str()),
        ("recaptcha_public_key", config.recaptcha_public_key.as_str()),
        (
            "recaptcha_private_key",
            config.recaptcha_private_key.as_str(),
        ),
    ] {
        out = substitute(&out, key, value)?;
    }
    Ok(out)
}

/// Ensures `config.inc.php` exists and carries the lab credentials.
#[derive(Debug, Clone)]
pub struct AppConfig {
    config_dir: PathBuf,
    lab: LabConfig,
}

impl AppConfig {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            config_dir: config.checkout_path().join("config"),
            lab: config.clone(),
        }
    }

    fn live_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn template_path(&self) -> PathBuf {
        self.config_dir.join(TEMPLATE_FILE)
    }

    /// Copy the `.dist` template to the live name if the live file is absent.
    fn materialize(&self) -> Result<bool> {
        if self.live_path().exists() {
            return Ok(false);
        }
        let template = self.template_path();
        if !template.exists() {
            return Err(ProvisionError::MissingFile {
                path: template,
                hint: Some("the checkout may be incomplete or the upstream layout changed".into()),
            }
            .into());
        }
        fs::copy(&template, self.live_path()).with_context(|| {
            format!("Could not copy {} to {}", template.display(), CONFIG_FILE)
        })?;
        Ok(true)
    }
}

impl Stage for AppConfig {
    fn name(&self) -> &'static str {
        "app-config"
    }

    fn description(&self) -> String {
        format!(
            "Write lab credentials into {}",
            self.live_path().display()
        )
    }

    fn current_state(&self) -> Result<StageState> {
        let live = self.live_path();
        if !live.exists() {
            return Ok(StageState::Absent);
        }
        let content = fs::read_to_string(&live)
            .with_context(|| format!("Could not read {}", live.display()))?;
        if patch_values(&content, &self.lab)? == content {
            Ok(StageState::Present { details: None })
        } else {
            Ok(StageState::Modified {
                from: "template values".into(),
                to: "lab credentials".into(),
            })
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

        let created = self.materialize()?;

        let live = self.live_path();
        let content = fs::read_to_string(&live)
            .with_context(|| format!("Could not read {}", live.display()))?;
        let patched = patch_values(&content, &self.lab)?;

        if patched == content {
            return Ok(if created {
                ApplyOutcome::Created
            } else {
                ApplyOutcome::NoChange
            });
        }

        // Full read-modify-write; the file is small and partial edits would
        // leave mixed credentials on interruption.
        fs::write(&live, patched)
            .with_context(|| format!("Could not write {}", live.display()))?;

        Ok(if created {
            ApplyOutcome::Created
        } else {
            ApplyOutcome::Modified
        })
    }
}
