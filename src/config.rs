use crate::editor::SettingsMap;
use crate::environment::EnvMap;
use crate::error::DevboxError;
use crate::package_manager::secondary_manager;
use crate::process::CommandSpec;
use crate::toolchain::{command_hook, ManagerPackages, Toolchain};
use crate::util::xdg;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the environment file location.
pub const ENV_FILE_VAR: &str = "DEVBOX_ENV_FILE";

const DEFAULT_ENV_FILE_NAME: &str = "00-env-devbox.zsh";

/// User configuration, read from `$XDG_CONFIG_HOME/devbox/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Shell file receiving toolchain environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    /// Explicit location of the editor `settings.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_settings: Option<String>,
    /// Seconds any single external command may run. Unset or 0 means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub toolchains: BTreeMap<String, ToolchainConfig>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, toml::Value>,
}

/// A toolchain defined in the config file, keyed by name under
/// `[toolchains.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<String>,
    /// Kept in file order; a value may refer to variables declared above it.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: EnvMap,
    /// Package manager name (`go`, `pip`, `npm`, `cargo`, `krew`) to packages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_packages: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editor_extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub editor_settings: BTreeMap<String, toml::Value>,
    /// Commands run after everything else, each as an argv list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<Vec<String>>,
}

impl ToolchainConfig {
    pub fn into_toolchain(self, name: &str) -> Result<Toolchain> {
        let mut extra_packages = Vec::new();
        for (manager, packages) in self.extra_packages {
            let manager = secondary_manager(&manager).with_context(|| {
                format!("Toolchain '{name}' uses unknown package manager '{manager}'")
            })?;
            extra_packages.push(ManagerPackages { manager, packages });
        }

        let editor_settings: SettingsMap = self
            .editor_settings
            .into_iter()
            .map(|(key, value)| Ok((key, serde_json::to_value(value)?)))
            .collect::<Result<_, serde_json::Error>>()
            .with_context(|| format!("Invalid editor settings for toolchain '{name}'"))?;

        let mut commands = Vec::new();
        for argv in &self.post_install {
            let spec = CommandSpec::from_argv(argv).with_context(|| {
                format!("Toolchain '{name}' has an empty post_install command")
            })?;
            commands.push(spec);
        }

        Ok(Toolchain {
            name: name.to_string(),
            description: self.description,
            packages: self.packages,
            binaries: self.binaries,
            applications: self.applications,
            environment: self.environment,
            extra_packages,
            editor_extensions: self.editor_extensions,
            editor_settings,
            post_install: (!commands.is_empty()).then(|| command_hook(commands)),
        })
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        Ok(xdg::config_dir()?.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let settings: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        if !settings.extras.is_empty() {
            tracing::debug!(keys = ?settings.extras.keys().collect::<Vec<_>>(), "Ignoring unknown config keys");
        }
        Ok(settings)
    }

    /// Environment file path: `DEVBOX_ENV_FILE`, then `env_file`, then
    /// `$ZSH_CUSTOM/00-env-devbox.zsh`.
    pub fn env_file_path(&self) -> Result<PathBuf, DevboxError> {
        let raw = match env::var(ENV_FILE_VAR) {
            Ok(value) => value,
            Err(_) => match &self.env_file {
                Some(value) => value.clone(),
                None => default_env_file()
                    .map(|path| path.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            },
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DevboxError::EmptyEnvFilePath);
        }
        Ok(expand_path(trimmed))
    }

    pub fn editor_settings_path(&self) -> Option<PathBuf> {
        self.editor_settings
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(expand_path)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn toolchains(&self) -> Result<Vec<Toolchain>> {
        self.toolchains
            .iter()
            .map(|(name, config)| config.clone().into_toolchain(name))
            .collect()
    }
}

fn default_env_file() -> Option<PathBuf> {
    let custom = match env::var("ZSH_CUSTOM") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => xdg::home_dir().ok()?.join(".oh-my-zsh").join("custom"),
    };
    Some(custom.join(DEFAULT_ENV_FILE_NAME))
}

fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(path),
    }
}
