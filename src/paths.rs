//! Path resolution for couchbucket
//!
//! # Environment Variables
//!
//! - `COUCHBUCKET_CONFIG_DIR` - Override the config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `COUCHBUCKET_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/couchbucket` (if set)
//! 3. `~/.config/couchbucket`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "COUCHBUCKET_CONFIG_DIR";

/// File name of the bucket manifest inside the config directory
pub const MANIFEST_FILE: &str = "buckets.toml";

/// Get the couchbucket config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Ok(expand(&xdg).join("couchbucket"));
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("couchbucket"))
}

/// Resolve the manifest path: an explicit path wins over the default
/// `buckets.toml` in [`config_dir`].
pub fn manifest_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(path)),
        None => Ok(config_dir()?.join(MANIFEST_FILE)),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
