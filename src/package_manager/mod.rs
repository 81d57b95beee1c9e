//! External package managers and how they are invoked.

mod catalog;
mod detect;

pub use catalog::{editor_manager, secondary_manager, system_managers};
pub use detect::Detector;

use crate::error::DevboxError;
use crate::outcome::Outcome;
use crate::process::{CommandRunner, CommandSpec};
use std::fmt;

/// Invocation convention of one installer executable.
///
/// Built only from the fixed catalog, so the name is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageManager {
    name: String,
    install_cmd: String,
    no_interactive_arg: Option<String>,
    multi_install: bool,
    sudo_required: bool,
}

impl PackageManager {
    pub(crate) fn new(name: &str, install_cmd: &str) -> Self {
        Self {
            name: name.to_string(),
            install_cmd: install_cmd.to_string(),
            no_interactive_arg: None,
            multi_install: false,
            sudo_required: false,
        }
    }

    pub(crate) fn no_interactive(mut self, arg: &str) -> Self {
        self.no_interactive_arg = Some(arg.to_string());
        self
    }

    pub(crate) fn multi_install(mut self) -> Self {
        self.multi_install = true;
        self
    }

    pub(crate) fn sudo(mut self) -> Self {
        self.sudo_required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn install_cmd(&self) -> &str {
        &self.install_cmd
    }

    pub fn no_interactive_arg(&self) -> Option<&str> {
        self.no_interactive_arg.as_deref()
    }

    pub fn is_multi_install(&self) -> bool {
        self.multi_install
    }

    pub fn requires_sudo(&self) -> bool {
        self.sudo_required
    }

    /// `[sudo] <name> <install_cmd> <packages...> [no_interactive_arg]`
    pub fn invocation(&self, packages: &[String]) -> CommandSpec {
        let spec = if self.sudo_required {
            CommandSpec::new("sudo").arg(&self.name)
        } else {
            CommandSpec::new(&self.name)
        };
        let spec = spec.arg(&self.install_cmd).args(packages.iter().cloned());
        match &self.no_interactive_arg {
            Some(flag) => spec.arg(flag),
            None => spec,
        }
    }

    /// Install `packages`, which the caller has already de-duplicated.
    ///
    /// Multi-install managers get one invocation and fail as a unit. Others
    /// get one invocation per package, every package is attempted, and the
    /// failures come back in package order.
    pub async fn install(&self, runner: &dyn CommandRunner, packages: &[String]) -> Outcome {
        if packages.is_empty() {
            return Outcome::Ok;
        }

        if self.multi_install {
            return self.install_batch(runner, packages).await.into();
        }

        let mut outcome = Outcome::Ok;
        for package in packages {
            if let Err(error) = self.install_one(runner, package).await {
                outcome.push(error);
            }
        }
        outcome
    }

    async fn install_batch(
        &self,
        runner: &dyn CommandRunner,
        packages: &[String],
    ) -> Result<(), DevboxError> {
        tracing::info!(manager = %self.name, packages = ?packages, "Installing packages");
        let spec = self.invocation(packages);

        let failure = match runner.run(&spec).await {
            Ok(output) if output.success => None,
            Ok(output) => Some((output.status, output.stderr)),
            Err(error) => Some((error.to_string(), String::new())),
        };

        match failure {
            None => {
                tracing::info!(manager = %self.name, "Successfully installed packages");
                Ok(())
            }
            Some((message, stderr)) => {
                tracing::error!(manager = %self.name, %message, "Error installing packages");
                Err(DevboxError::BatchInstallFailed {
                    manager: self.name.clone(),
                    message,
                    stderr: stderr.trim().to_string(),
                })
            }
        }
    }

    async fn install_one(
        &self,
        runner: &dyn CommandRunner,
        package: &str,
    ) -> Result<(), DevboxError> {
        tracing::info!(manager = %self.name, package, "Installing package");
        let spec = self.invocation(std::slice::from_ref(&package.to_string()));

        let failure = match runner.run(&spec).await {
            Ok(output) if output.success => None,
            Ok(output) => Some((output.status, output.stderr)),
            Err(error) => Some((error.to_string(), String::new())),
        };

        match failure {
            None => {
                tracing::info!(manager = %self.name, package, "Successfully installed package");
                Ok(())
            }
            Some((message, stderr)) => {
                tracing::error!(manager = %self.name, package, %message, "Error installing package");
                Err(DevboxError::PackageInstallFailed {
                    manager: self.name.clone(),
                    package: package.to_string(),
                    message,
                    stderr: stderr.trim().to_string(),
                })
            }
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Install through a manager that may not have been resolved.
pub async fn install_with(
    manager: Option<&PackageManager>,
    runner: &dyn CommandRunner,
    packages: &[String],
) -> Outcome {
    match manager {
        Some(manager) => manager.install(runner, packages).await,
        None => DevboxError::UnsupportedPackageManager.into(),
    }
}
