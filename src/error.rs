use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while provisioning toolchains.
///
/// Configuration errors abort the requested operation up front. Everything
/// else is collected per phase into an [`Outcome`](crate::Outcome) so a single
/// run reports every failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DevboxError {
    #[error("package manager is not specified or unsupported")]
    UnsupportedPackageManager,

    #[error("no supported package manager found")]
    NoPackageManager,

    #[error("no toolchains specified, use `devbox list` to see available toolchains")]
    NoToolchains,

    #[error("unknown toolchain(s): {}", .0.join(", "))]
    UnknownToolchain(Vec<String>),

    #[error("environment file path is empty, set DEVBOX_ENV_FILE or `env_file` to a valid path")]
    EmptyEnvFilePath,

    #[error("invalid environment file {path:?}: {reason}")]
    InvalidEnvFile { path: PathBuf, reason: String },

    #[error("failed to install packages using {manager}: {message}, stderr: {stderr}")]
    BatchInstallFailed {
        manager: String,
        message: String,
        stderr: String,
    },

    #[error("failed to install package {package} using {manager}: {message}, stderr: {stderr}")]
    PackageInstallFailed {
        manager: String,
        package: String,
        message: String,
        stderr: String,
    },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("distrobox-export command is not available, please install it or ensure you are inside the distrobox")]
    ExporterUnavailable,

    #[error("failed to export {kind} {name}: {message}")]
    ExportFailed {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("failed to read editor settings {path:?}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse editor settings {path:?}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write editor settings {path:?}: {source}")]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to update environment file {path:?}: {source}")]
    EnvFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl DevboxError {
    /// Whether the error describes a misconfiguration rather than a failed tool.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPackageManager
                | Self::NoPackageManager
                | Self::NoToolchains
                | Self::UnknownToolchain(_)
                | Self::EmptyEnvFilePath
                | Self::InvalidEnvFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_toolchain_lists_every_name() {
        let error = DevboxError::UnknownToolchain(vec!["zig".to_string(), "ocaml".to_string()]);
        assert_eq!(error.to_string(), "unknown toolchain(s): zig, ocaml");
        assert!(error.is_configuration());
    }

    #[test]
    fn install_failures_mention_manager_and_stderr() {
        let error = DevboxError::PackageInstallFailed {
            manager: "go".to_string(),
            package: "gopls".to_string(),
            message: "exit status: 1".to_string(),
            stderr: "not found".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("gopls"));
        assert!(text.contains("go"));
        assert!(text.contains("not found"));
        assert!(!error.is_configuration());
    }
}
