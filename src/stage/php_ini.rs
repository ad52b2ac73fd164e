//! PHP runtime config stage - enable the url-handling flags DVWA needs.
//!
//! The php.ini path depends on the installed PHP version. Detection parses
//! `php -v`; when that fails the configured default version is used with a
//! warning instead of aborting, since a wrong path surfaces as a clear
//! missing-file error one step later where the operator can correct it.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::PathBuf;

use super::{ApplyContext, ApplyOutcome, Stage, StageState};
use crate::config::LabConfig;
use crate::error::ProvisionError;
use crate::runner;
use crate::ui;

const FLAGS: [(&str, &str); 2] = [
    ("allow_url_fopen = Off", "allow_url_fopen = On"),
    ("allow_url_include = Off", "allow_url_include = On"),
];

/// Extract `major.minor` from `php -v` output, e.g. `"PHP 8.1.2 (cli)..."`
/// yields `"8.1"`.
pub fn extract_version(output: &str) -> Option<String> {
    let re = Regex::new(r"PHP (\d+\.\d+)").ok()?;
    re.captures(output).map(|c| c[1].to_string())
}

/// Turn both url-handling flags On. Literal substring replacement: lines
/// already `On` (or commented out) are left untouched, as is everything
/// else in the file.
pub fn patch_flags(content: &str) -> String {
    let mut out = content.to_string();
    for (off, on) in FLAGS {
        out = out.replace(off, on);
    }
    out
}

#[derive(Debug, Clone)]
pub struct PhpIniPatch {
    lab: LabConfig,
}

impl PhpIniPatch {
    pub fn new(config: &LabConfig) -> Self {
        Self { lab: config.clone() }
    }

    /// Detected PHP version, or the configured default with a warning.
    fn resolve_version(&self) -> String {
        match runner::run_capture("php", &["-v"])
            .ok()
            .and_then(|out| extract_version(&out))
        {
            Some(version) => {
                log::debug!("detected PHP version {version}");
                version
            }
            None => {
                ui::warn(&format!(
                    "Could not determine PHP version; defaulting to {}. \
                     You may need to adjust the php.ini path manually.",
                    self.lab.php_default_version
                ));
                self.lab.php_default_version.clone()
            }
        }
    }

    fn ini_path(&self) -> PathBuf {
        self.lab.php_ini_path(&self.resolve_version())
    }

    fn read_ini(&self) -> Result<(PathBuf, String)> {
        let path = self.ini_path();
        if !path.exists() {
            return Err(ProvisionError::MissingFile {
                path,
                hint: Some(
                    "check your PHP version and installation path; a detection \
                     mismatch puts the php.ini somewhere else"
                        .into(),
                ),
            }
            .into());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Ok((path, content))
    }
}

impl Stage for PhpIniPatch {
    fn name(&self) -> &'static str {
        "php-ini"
    }

    fn description(&self) -> String {
        format!(
            "Enable allow_url_fopen/allow_url_include in {}",
            self.lab
                .php_ini_template
                .replace(crate::config::VERSION_PLACEHOLDER, "<version>")
        )
    }

    fn current_state(&self) -> Result<StageState> {
        let path = self.ini_path();
        if !path.exists() {
            return Ok(StageState::Absent);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        if patch_flags(&content) == content {
            Ok(StageState::Present { details: None })
        } else {
            Ok(StageState::Modified {
                from: "Off".into(),
                to: "On".into(),
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

        let (path, content) = self.read_ini()?;
        let patched = patch_flags(&content);
        if patched == content {
            return Ok(ApplyOutcome::NoChange);
        }

        fs::write(&path, patched)
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(ApplyOutcome::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INI: &str = "\
; PHP configuration
engine = On
allow_url_fopen = Off
allow_url_include = Off
display_errors = Off
";

    #[test]
    fn extract_version_takes_major_minor() {
        let out = "PHP 8.1.2 (cli) (built: Jan  1 2024 00:00:00) (NTS)";
        assert_eq!(extract_version(out).unwrap(), "8.1");
    }

    #[test]
    fn extract_version_rejects_unexpected_output() {
        assert!(extract_version("zsh: command not found: php").is_none());
        assert!(extract_version("").is_none());
    }

    #[test]
    fn patch_flags_turns_both_flags_on() {
        let patched = patch_flags(INI);
        assert!(patched.contains("allow_url_fopen = On"));
        assert!(patched.contains("allow_url_include = On"));
        // No other line altered
        assert!(patched.contains("engine = On"));
        assert!(patched.contains("display_errors = Off"));
    }

    #[test]
    fn patch_flags_is_idempotent() {
        let once = patch_flags(INI);
        assert_eq!(patch_flags(&once), once);
    }

    /// The version the stage will resolve on this host: detected when php
    /// is installed, the configured default otherwise.
    fn resolved_version(lab: &LabConfig) -> String {
        runner::run_capture("php", &["-v"])
            .ok()
            .and_then(|out| extract_version(&out))
            .unwrap_or_else(|| lab.php_default_version.clone())
    }

    #[test]
    fn apply_patches_the_ini_in_place() {
        let root = TempDir::new().unwrap();
        let lab = LabConfig {
            php_ini_template: format!("{}/{{version}}/php.ini", root.path().to_string_lossy()),
            ..Default::default()
        };
        let versioned = root.path().join(resolved_version(&lab));
        fs::create_dir(&versioned).unwrap();
        fs::write(versioned.join("php.ini"), INI).unwrap();

        let stage = PhpIniPatch::new(&lab);
        let mut ctx = ApplyContext {
            dry_run: false,
            verbose: false,
        };

        assert_eq!(stage.apply(&mut ctx).unwrap(), ApplyOutcome::Modified);
        let content = fs::read_to_string(versioned.join("php.ini")).unwrap();
        assert!(content.contains("allow_url_fopen = On"));
        assert!(content.contains("allow_url_include = On"));

        // Rerun converges
        assert_eq!(stage.apply(&mut ctx).unwrap(), ApplyOutcome::NoChange);
        assert_eq!(
            stage.current_state().unwrap(),
            StageState::Present { details: None }
        );
    }

    #[test]
    fn missing_ini_is_a_missing_file_error_with_hint() {
        let root = TempDir::new().unwrap();
        let lab = LabConfig {
            php_ini_template: format!("{}/{{version}}/php.ini", root.path().to_string_lossy()),
            ..Default::default()
        };
        let stage = PhpIniPatch::new(&lab);
        let mut ctx = ApplyContext {
            dry_run: false,
            verbose: false,
        };

        let err = stage.apply(&mut ctx).unwrap_err();
        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::MissingFile { hint, .. }) => {
                assert!(hint.as_deref().unwrap_or("").contains("PHP version"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
