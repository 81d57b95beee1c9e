use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Get the XDG config directory for devbox
///
/// Returns `$XDG_CONFIG_HOME/devbox` or `~/.config/devbox` if not set
pub fn config_dir() -> Result<PathBuf> {
    let base = match env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => home_dir()?.join(".config"),
    };

    Ok(base.join("devbox"))
}

/// Get the home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .context("Failed to get home directory")
        .map(|bd| bd.home_dir().to_path_buf())
}
