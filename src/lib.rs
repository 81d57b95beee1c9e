// Public API
pub mod cli;
pub mod commands;

// Core domain types
mod config;
mod editor;
mod environment;
mod error;
mod export;
mod outcome;
mod package_manager;
mod process;
mod task_group;
mod toolchain;
mod ui;
mod util;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use config::{Settings, ToolchainConfig};
pub use editor::{EditorSettings, SettingsMap, VsCodeSettings};
pub use environment::{EnvFile, EnvMap, EnvStore};
pub use error::DevboxError;
pub use export::{DistroboxExporter, ExportKind, Exporter};
pub use outcome::Outcome;
pub use package_manager::{Detector, PackageManager};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use task_group::TaskGroup;
pub use toolchain::{Catalog, HookContext, Installer, PostInstallHook, SharedArgs, Toolchain};
