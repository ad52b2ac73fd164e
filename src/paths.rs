//! Centralized path resolution for vulnlab.
//!
//! # Environment Variables
//!
//! - `VULNLAB_CONFIG_DIR` - Override config directory (e.g., `~/labs/vulnlab`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `VULNLAB_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/vulnlab` (if set)
//! 3. Default: `~/.config/vulnlab`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "VULNLAB_CONFIG_DIR";

/// Get the vulnlab config directory path
pub fn config_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("vulnlab");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.config/vulnlab
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("vulnlab");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// This is the canonical path expansion function for vulnlab. All modules
/// should use this instead of calling shellexpand directly.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
