use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::editor::VsCodeSettings;
use crate::environment::EnvFile;
use crate::export::DistroboxExporter;
use crate::outcome::Outcome;
use crate::package_manager::{system_managers, Detector};
use crate::process::{CommandRunner, SystemRunner};
use crate::toolchain::{Catalog, Installer, SharedArgs};
use crate::ui;
use anyhow::Result;
use std::sync::Arc;

mod install;
mod list;
mod setup;
mod share;

pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let settings = Settings::load(&config_path)?;
    let catalog = Catalog::builtin().with_toolchains(settings.toolchains()?);
    let args = SharedArgs::from(cli.shared);

    match cli.command {
        Commands::Setup => setup::execute(&settings, &catalog, &args).await,

        Commands::Install { file, toolchains } => {
            install::execute(&settings, &catalog, &args, toolchains, file).await
        }

        Commands::Share { packages } => share::execute(&settings, &args, packages).await,

        Commands::List => list::execute(&catalog),
    }
}

/// Wire the real collaborators. Configuration problems (env file, package
/// manager) fail here, before anything is installed.
fn build_installer(settings: &Settings) -> Result<Installer> {
    let env_file = EnvFile::open(settings.env_file_path()?)?;
    tracing::debug!(path = ?env_file.path(), "Using environment file");

    let system = Detector::new(system_managers()).detect()?.clone();
    tracing::info!(manager = %system, "Detected system package manager");

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(settings.command_timeout()));
    let exporter = Arc::new(DistroboxExporter::new(runner.clone()));
    let editor = Arc::new(VsCodeSettings::new(settings.editor_settings_path()));

    Ok(Installer::new(
        Some(system),
        runner,
        exporter,
        Arc::new(env_file),
        editor,
    ))
}

/// Close out a progress line and surface every collected error.
fn finish(progress: ui::Progress, outcome: Outcome) -> Result<()> {
    match outcome.into_errors() {
        None => {
            progress.success("Finished", None);
            Ok(())
        }
        Some(errors) => {
            progress.fail("Failed", format!("{} error(s)", errors.len()));
            for error in &errors {
                tracing::debug!(error = ?error, "Install error");
                ui::error(error);
            }
            anyhow::bail!("{} error(s) occurred during install", errors.len())
        }
    }
}
