//! Making container binaries and applications visible on the host.

use crate::error::DevboxError;
use crate::outcome::Outcome;
use crate::process::{CommandRunner, CommandSpec};
use crate::toolchain::merge_unique;
use async_trait::async_trait;
use std::sync::Arc;

pub const DISTROBOX_EXPORT: &str = "distrobox-export";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Binary,
    App,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Binary => "binary",
            ExportKind::App => "application",
        }
    }

    fn list_flag(self) -> &'static str {
        match self {
            ExportKind::Binary => "--list-binaries",
            ExportKind::App => "--list-apps",
        }
    }
}

#[async_trait]
pub trait Exporter: Send + Sync {
    /// Whether the backing export command can be run at all.
    fn is_available(&self) -> bool;

    async fn is_exported(&self, kind: ExportKind, name: &str) -> Result<bool, DevboxError>;

    async fn export(&self, kind: ExportKind, name: &str) -> Result<(), DevboxError>;
}

/// Exports through `distrobox-export`.
pub struct DistroboxExporter {
    runner: Arc<dyn CommandRunner>,
    available: bool,
}

impl DistroboxExporter {
    /// Availability is checked once here and never re-checked.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let available = runner.lookup(DISTROBOX_EXPORT).is_some();
        if !available {
            tracing::debug!("{DISTROBOX_EXPORT} not found on PATH");
        }
        Self { runner, available }
    }

    fn failed(kind: ExportKind, name: &str, message: impl Into<String>) -> DevboxError {
        DevboxError::ExportFailed {
            kind: kind.as_str(),
            name: name.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Exporter for DistroboxExporter {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn is_exported(&self, kind: ExportKind, name: &str) -> Result<bool, DevboxError> {
        if !self.available {
            return Err(DevboxError::ExporterUnavailable);
        }

        tracing::debug!(kind = kind.as_str(), name, "Checking export state");
        let spec = CommandSpec::new(DISTROBOX_EXPORT).arg(kind.list_flag());
        let output = self.runner.run(&spec).await?.check(&spec)?;
        Ok(listing_contains(&output.stdout, name))
    }

    async fn export(&self, kind: ExportKind, name: &str) -> Result<(), DevboxError> {
        if !self.available {
            return Err(DevboxError::ExporterUnavailable);
        }

        let spec = match kind {
            ExportKind::Binary => {
                let path = self
                    .runner
                    .lookup(name)
                    .ok_or_else(|| Self::failed(kind, name, "not found on PATH"))?;
                CommandSpec::new(DISTROBOX_EXPORT)
                    .arg("--bin")
                    .arg(path.to_string_lossy())
            }
            ExportKind::App => CommandSpec::new(DISTROBOX_EXPORT).arg("--app").arg(name),
        };

        tracing::info!(kind = kind.as_str(), name, "Exporting to host");
        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|error| Self::failed(kind, name, error.to_string()))?;
        if !output.success {
            return Err(Self::failed(kind, name, output.stderr.trim()));
        }
        Ok(())
    }
}

/// Exported entries are listed one per line, either by name or by a path
/// ending in the name.
fn listing_contains(listing: &str, name: &str) -> bool {
    let suffix = format!("/{name}");
    listing
        .split(|c: char| c.is_whitespace() || c == '|')
        .any(|token| token == name || token.ends_with(&suffix))
}

/// Export one de-duplicated set of binaries and applications.
///
/// Applications are exported as binaries too, then additionally as
/// applications. Entries already exported are skipped. An unavailable
/// exporter yields exactly one error for the whole phase.
pub async fn export_phase(
    exporter: &dyn Exporter,
    binaries: &[String],
    applications: &[String],
) -> Outcome {
    let as_binaries = merge_unique([binaries, applications]);
    if as_binaries.is_empty() {
        return Outcome::Ok;
    }
    if !exporter.is_available() {
        tracing::error!("{}", DevboxError::ExporterUnavailable);
        return DevboxError::ExporterUnavailable.into();
    }

    let (binaries, applications) = futures::join!(
        export_each(exporter, ExportKind::Binary, &as_binaries),
        export_each(exporter, ExportKind::App, applications),
    );
    binaries.merge(applications)
}

async fn export_each(exporter: &dyn Exporter, kind: ExportKind, names: &[String]) -> Outcome {
    let mut outcome = Outcome::Ok;
    for name in names {
        match exporter.is_exported(kind, name).await {
            Ok(true) => tracing::debug!(kind = kind.as_str(), name = %name, "Already exported"),
            Ok(false) => {
                if let Err(error) = exporter.export(kind, name).await {
                    outcome.push(error);
                }
            }
            Err(error) => outcome.push(error),
        }
    }
    outcome
}
