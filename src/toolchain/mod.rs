//! Toolchains: declarative bundles of packages, exports, environment and
//! editor configuration, and the installer that applies them.

mod catalog;
mod installer;

pub use catalog::{Catalog, DEFAULT_IDE};
pub use installer::Installer;

use crate::editor::SettingsMap;
use crate::environment::EnvMap;
use crate::outcome::Outcome;
use crate::package_manager::PackageManager;
use crate::process::{CommandRunner, CommandSpec};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Flags shared by every subcommand, read-only for the install phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedArgs {
    pub skip_ide: bool,
    pub no_export: bool,
}

/// Packages a toolchain installs through a manager other than the system one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerPackages {
    pub manager: PackageManager,
    pub packages: Vec<String>,
}

/// What a post-install hook gets to work with.
#[derive(Clone)]
pub struct HookContext {
    pub args: SharedArgs,
    pub runner: Arc<dyn CommandRunner>,
}

pub type PostInstallHook = Arc<dyn Fn(HookContext) -> BoxFuture<'static, Outcome> + Send + Sync>;

/// Hook that runs `commands` one after another and collects every failure.
pub fn command_hook(commands: Vec<CommandSpec>) -> PostInstallHook {
    Arc::new(move |context: HookContext| {
        let commands = commands.clone();
        async move {
            let mut outcome = Outcome::Ok;
            for spec in &commands {
                tracing::info!(command = %spec, "Running post-install command");
                let result = context
                    .runner
                    .run(spec)
                    .await
                    .and_then(|output| output.check(spec));
                if let Err(error) = result {
                    outcome.push(error);
                }
            }
            outcome
        }
        .boxed()
    })
}

#[derive(Clone, Default)]
pub struct Toolchain {
    pub name: String,
    pub description: String,
    /// Installed with the system package manager.
    pub packages: Vec<String>,
    pub binaries: Vec<String>,
    pub applications: Vec<String>,
    pub environment: EnvMap,
    pub extra_packages: Vec<ManagerPackages>,
    pub editor_extensions: Vec<String>,
    pub editor_settings: SettingsMap,
    /// Runs after every other phase of the install has finished.
    pub post_install: Option<PostInstallHook>,
}

impl Toolchain {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn packages(mut self, packages: &[&str]) -> Self {
        self.packages = to_strings(packages);
        self
    }

    pub(crate) fn binaries(mut self, binaries: &[&str]) -> Self {
        self.binaries = to_strings(binaries);
        self
    }

    pub(crate) fn env(mut self, pairs: &[(&str, &str)]) -> Self {
        self.environment = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub(crate) fn extra(mut self, manager: PackageManager, packages: &[&str]) -> Self {
        self.extra_packages.push(ManagerPackages {
            manager,
            packages: to_strings(packages),
        });
        self
    }

    pub(crate) fn extensions(mut self, extensions: &[&str]) -> Self {
        self.editor_extensions = to_strings(extensions);
        self
    }

    pub(crate) fn settings(mut self, settings: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = settings {
            self.editor_settings = map;
        }
        self
    }
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("packages", &self.packages)
            .field("binaries", &self.binaries)
            .field("applications", &self.applications)
            .field("environment", &self.environment)
            .field("extra_packages", &self.extra_packages)
            .field("editor_extensions", &self.editor_extensions)
            .field("editor_settings", &self.editor_settings)
            .field("post_install", &self.post_install.is_some())
            .finish()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Concatenate lists dropping repeats. The first occurrence keeps its position.
pub fn merge_unique<'a, I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for item in list {
            if seen.insert(item.as_str()) {
                merged.push(item.clone());
            }
        }
    }
    merged
}

/// Group package lists by manager, in order of first appearance, with each
/// manager's packages de-duplicated.
pub fn group_by_manager<'a, I>(entries: I) -> Vec<ManagerPackages>
where
    I: IntoIterator<Item = &'a ManagerPackages>,
{
    let mut grouped: Vec<(PackageManager, Vec<&'a [String]>)> = Vec::new();
    for entry in entries {
        match grouped.iter_mut().find(|(manager, _)| *manager == entry.manager) {
            Some((_, lists)) => lists.push(entry.packages.as_slice()),
            None => grouped.push((entry.manager.clone(), vec![entry.packages.as_slice()])),
        }
    }

    grouped
        .into_iter()
        .map(|(manager, lists)| ManagerPackages {
            manager,
            packages: merge_unique(lists),
        })
        .filter(|group| !group.packages.is_empty())
        .collect()
}
