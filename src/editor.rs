//! Editor `settings.json` handling.

use crate::error::DevboxError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Setting key to arbitrary JSON value.
pub type SettingsMap = Map<String, Value>;

#[async_trait]
pub trait EditorSettings: Send + Sync {
    /// Shallow-merge `settings` into the stored settings: new keys override
    /// existing keys of the same name, everything else is left alone.
    async fn update(&self, settings: &SettingsMap) -> Result<(), DevboxError>;
}

/// The user `settings.json` of VS Code.
#[derive(Debug, Clone)]
pub struct VsCodeSettings {
    override_path: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl VsCodeSettings {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self {
            override_path,
            home,
        }
    }

    #[cfg(test)]
    fn with_home(home: &Path) -> Self {
        Self {
            override_path: None,
            home: Some(home.to_path_buf()),
        }
    }

    /// Standard locations for the current platform, default first.
    fn candidates(&self) -> Vec<PathBuf> {
        let user_settings = |base: PathBuf| base.join("Code").join("User").join("settings.json");

        if cfg!(target_os = "windows") {
            return std::env::var_os("APPDATA")
                .map(|appdata| vec![user_settings(PathBuf::from(appdata))])
                .unwrap_or_default();
        }

        let Some(home) = &self.home else {
            return Vec::new();
        };
        if cfg!(target_os = "macos") {
            vec![user_settings(home.join("Library").join("Application Support"))]
        } else {
            vec![
                user_settings(home.join(".config")),
                // Flatpak install
                user_settings(
                    home.join(".var")
                        .join("app")
                        .join("com.visualstudio.code")
                        .join("config"),
                ),
            ]
        }
    }

    /// Find the settings file, creating the platform default with `{}` when
    /// none exists yet.
    pub async fn locate(&self) -> Result<PathBuf, DevboxError> {
        if let Some(path) = &self.override_path {
            if fs::try_exists(path).await.unwrap_or(false) {
                return Ok(path.clone());
            }
            return Err(DevboxError::SettingsRead {
                path: path.clone(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "configured settings file does not exist",
                ),
            });
        }

        let candidates = self.candidates();
        for path in &candidates {
            if fs::try_exists(path).await.unwrap_or(false) {
                return Ok(path.clone());
            }
        }

        let default = candidates.into_iter().next().ok_or_else(|| DevboxError::SettingsRead {
            path: PathBuf::from("settings.json"),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "cannot determine the editor settings location",
            ),
        })?;
        tracing::warn!(
            path = %default.display(),
            "Editor settings not found in standard locations, creating default"
        );
        create_empty(&default).await?;
        Ok(default)
    }
}

async fn create_empty(path: &Path) -> Result<(), DevboxError> {
    let write_error = |source| DevboxError::SettingsWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    fs::write(path, b"{}").await.map_err(write_error)
}

#[async_trait]
impl EditorSettings for VsCodeSettings {
    async fn update(&self, settings: &SettingsMap) -> Result<(), DevboxError> {
        let path = self.locate().await?;

        tracing::debug!(file = %path.display(), "Reading editor settings");
        let data = fs::read_to_string(&path)
            .await
            .map_err(|source| DevboxError::SettingsRead {
                path: path.clone(),
                source,
            })?;
        let mut current: SettingsMap = if data.trim().is_empty() {
            SettingsMap::new()
        } else {
            serde_json::from_str(&data).map_err(|source| DevboxError::SettingsParse {
                path: path.clone(),
                source,
            })?
        };

        for (key, value) in settings {
            current.insert(key.clone(), value.clone());
        }

        let mut updated =
            serde_json::to_string_pretty(&current).map_err(|source| DevboxError::SettingsParse {
                path: path.clone(),
                source,
            })?;
        updated.push('\n');

        tracing::debug!(file = %path.display(), keys = settings.len(), "Writing editor settings");
        fs::write(&path, updated)
            .await
            .map_err(|source| DevboxError::SettingsWrite {
                path: path.clone(),
                source,
            })
    }
}
