//! Lab configuration.
//!
//! Every path, service name, and credential the provisioner touches lives
//! here, resolved once at startup and passed by reference into every stage.
//! Defaults reproduce the classic single-host DVWA layout; a TOML (or JSON)
//! file at `~/.config/vulnlab/config.toml` overrides any subset of fields.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Placeholder in `php_ini_template` replaced with the detected PHP version.
pub const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Web server document root the checkout lands under.
    pub web_root: String,
    /// Directory name of the checkout inside `web_root`.
    pub checkout_dir: String,
    /// Upstream repository to clone.
    pub repo_url: String,

    /// Database schema name.
    pub db_name: String,
    /// Database user the application authenticates as.
    pub db_user: String,
    /// Lab credential, stored in clear text on purpose. This tool sets up
    /// a deliberately vulnerable training target; never reuse a real secret.
    pub db_password: String,
    /// Host the database user is scoped to. Must match what the application
    /// config points at, or the app cannot authenticate.
    pub db_host: String,

    /// reCAPTCHA keys written into the application config (blank disables).
    pub recaptcha_public_key: String,
    pub recaptcha_private_key: String,

    /// Service-manager name of the database service.
    pub db_service: String,
    /// Service-manager name of the web server.
    pub web_service: String,

    /// Fallback when the PHP version cannot be parsed from `php -v`.
    pub php_default_version: String,
    /// php.ini location; `{version}` is replaced with the detected version.
    pub php_ini_template: String,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            web_root: "/var/www/html".into(),
            checkout_dir: "DVWA".into(),
            repo_url: "https://github.com/digininja/DVWA.git".into(),
            db_name: "dvwa".into(),
            db_user: "admin".into(),
            db_password: "password".into(),
            db_host: "127.0.0.1".into(),
            recaptcha_public_key: String::new(),
            recaptcha_private_key: String::new(),
            db_service: "mysql".into(),
            web_service: "apache2".into(),
            php_default_version: "8.2".into(),
            php_ini_template: "/etc/php/{version}/apache2/php.ini".into(),
        }
    }
}

impl LabConfig {
    /// Load the lab config.
    ///
    /// An explicit `--config` path must exist; otherwise `config.toml` (or
    /// `config.json`) under the config dir is used when present, and the
    /// documented defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            return Self::parse_file(path);
        }

        let dir = paths::config_dir()?;
        for name in ["config.toml", "config.json"] {
            let path = dir.join(name);
            if path.exists() {
                log::debug!("Loading config from {}", path.display());
                return Self::parse_file(&path);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;

        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what serde enforces.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("web_root", &self.web_root),
            ("checkout_dir", &self.checkout_dir),
            ("repo_url", &self.repo_url),
            ("db_name", &self.db_name),
            ("db_user", &self.db_user),
            ("db_host", &self.db_host),
            ("db_service", &self.db_service),
            ("web_service", &self.web_service),
            ("php_default_version", &self.php_default_version),
        ] {
            if value.trim().is_empty() {
                bail!("config field `{field}` must not be empty");
            }
        }

        if !self.php_ini_template.contains(VERSION_PLACEHOLDER) {
            bail!(
                "config field `php_ini_template` must contain the `{VERSION_PLACEHOLDER}` placeholder"
            );
        }

        if self.checkout_dir.contains('/') {
            bail!("config field `checkout_dir` must be a bare directory name");
        }

        Ok(())
    }

    /// Expanded web root path.
    pub fn web_root_path(&self) -> PathBuf {
        paths::expand(&self.web_root)
    }

    /// Expanded path of the checkout inside the web root.
    pub fn checkout_path(&self) -> PathBuf {
        self.web_root_path().join(&self.checkout_dir)
    }

    /// php.ini path for a detected (or defaulted) PHP version.
    pub fn php_ini_path(&self, version: &str) -> PathBuf {
        paths::expand(&self.php_ini_template.replace(VERSION_PLACEHOLDER, version))
    }

    /// URL the operator visits to finish setup through the application UI.
    pub fn setup_url(&self) -> String {
        format!("http://{}/{}", self.db_host, self.checkout_dir)
    }
}

// ============================================================================
// Tests
// ============================================================================
