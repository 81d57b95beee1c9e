use super::{group_by_manager, merge_unique, HookContext, SharedArgs, Toolchain};
use crate::editor::{EditorSettings, SettingsMap};
use crate::environment::{EnvMap, EnvStore};
use crate::error::DevboxError;
use crate::export::{export_phase, Exporter};
use crate::outcome::Outcome;
use crate::package_manager::{editor_manager, install_with, PackageManager};
use crate::process::CommandRunner;
use crate::task_group::TaskGroup;
use std::collections::HashSet;
use std::sync::Arc;

/// Applies toolchains using collaborators chosen once at startup.
///
/// Cloning is cheap; every spawned phase gets its own handle.
#[derive(Clone)]
pub struct Installer {
    system: Option<PackageManager>,
    editor_manager: PackageManager,
    runner: Arc<dyn CommandRunner>,
    exporter: Arc<dyn Exporter>,
    env: Arc<dyn EnvStore>,
    editor: Arc<dyn EditorSettings>,
}

impl Installer {
    pub fn new(
        system: Option<PackageManager>,
        runner: Arc<dyn CommandRunner>,
        exporter: Arc<dyn Exporter>,
        env: Arc<dyn EnvStore>,
        editor: Arc<dyn EditorSettings>,
    ) -> Self {
        Self {
            system,
            editor_manager: editor_manager(),
            runner,
            exporter,
            env,
            editor,
        }
    }

    /// Install one toolchain.
    ///
    /// The environment is persisted first, then system packages are
    /// installed. Export, editor tooling and each extra package manager then
    /// run concurrently, and the post-install hook runs once all of them are
    /// done. A failing phase never stops a later one.
    pub async fn install(&self, toolchain: &Toolchain, args: &SharedArgs) -> Outcome {
        tracing::info!(toolchain = %toolchain.name, "Installing toolchain");
        let mut outcome = self.persist_env(&[&toolchain.environment]).await;
        outcome = outcome.merge(self.install_system(&toolchain.packages).await);

        let mut group = TaskGroup::new();
        self.add_export(
            &mut group,
            args,
            toolchain.binaries.clone(),
            toolchain.applications.clone(),
        );
        self.add_editor(
            &mut group,
            args,
            toolchain.editor_extensions.clone(),
            toolchain.editor_settings.clone(),
        );
        for entry in &toolchain.extra_packages {
            self.add_manager(&mut group, entry.manager.clone(), entry.packages.clone());
        }
        outcome = outcome.merge(group.join().await);

        if let Some(hook) = &toolchain.post_install {
            tracing::info!(toolchain = %toolchain.name, "Running post-install hook");
            outcome = outcome.merge(hook(self.hook_context(args)).await);
        }
        outcome
    }

    /// Install several toolchains as one batch.
    ///
    /// Work shared between toolchains is merged first, so every package,
    /// export and extension is handled at most once and the editor settings
    /// file is written by a single task. Environments and settings are merged
    /// in input order, so later toolchains win on key collisions.
    pub async fn install_many(&self, toolchains: &[Toolchain], args: &SharedArgs) -> Outcome {
        if toolchains.is_empty() {
            return DevboxError::NoToolchains.into();
        }

        let mut seen = HashSet::new();
        let toolchains: Vec<&Toolchain> = toolchains
            .iter()
            .filter(|toolchain| seen.insert(toolchain.name.as_str()))
            .collect();
        tracing::info!(
            toolchains = ?toolchains.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Installing toolchains"
        );

        let environments: Vec<&EnvMap> = toolchains.iter().map(|t| &t.environment).collect();
        let mut outcome = self.persist_env(&environments).await;

        let packages = merge_unique(toolchains.iter().map(|t| t.packages.as_slice()));
        outcome = outcome.merge(self.install_system(&packages).await);

        let mut group = TaskGroup::new();
        self.add_export(
            &mut group,
            args,
            merge_unique(toolchains.iter().map(|t| t.binaries.as_slice())),
            merge_unique(toolchains.iter().map(|t| t.applications.as_slice())),
        );

        let mut settings = SettingsMap::new();
        for toolchain in &toolchains {
            for (key, value) in &toolchain.editor_settings {
                settings.insert(key.clone(), value.clone());
            }
        }
        self.add_editor(
            &mut group,
            args,
            merge_unique(toolchains.iter().map(|t| t.editor_extensions.as_slice())),
            settings,
        );

        for entry in group_by_manager(toolchains.iter().flat_map(|t| &t.extra_packages)) {
            self.add_manager(&mut group, entry.manager, entry.packages);
        }
        outcome = outcome.merge(group.join().await);

        let mut hooks = TaskGroup::new();
        for toolchain in &toolchains {
            if let Some(hook) = &toolchain.post_install {
                tracing::info!(toolchain = %toolchain.name, "Running post-install hook");
                hooks.add(hook(self.hook_context(args)));
            }
        }
        outcome.merge(hooks.join().await)
    }

    fn hook_context(&self, args: &SharedArgs) -> HookContext {
        HookContext {
            args: *args,
            runner: self.runner.clone(),
        }
    }

    async fn persist_env(&self, maps: &[&EnvMap]) -> Outcome {
        if maps.iter().all(|map| map.is_empty()) {
            return Outcome::Ok;
        }
        self.env.set(maps).await
    }

    async fn install_system(&self, packages: &[String]) -> Outcome {
        if packages.is_empty() {
            return Outcome::Ok;
        }
        install_with(self.system.as_ref(), self.runner.as_ref(), packages).await
    }

    fn add_export(
        &self,
        group: &mut TaskGroup,
        args: &SharedArgs,
        binaries: Vec<String>,
        applications: Vec<String>,
    ) {
        if args.no_export {
            tracing::debug!("Skipping export");
            return;
        }
        if binaries.is_empty() && applications.is_empty() {
            return;
        }
        let exporter = self.exporter.clone();
        group.add(async move { export_phase(exporter.as_ref(), &binaries, &applications).await });
    }

    /// Extensions and settings are two separate tasks; the settings file only
    /// ever gets one writer per call.
    fn add_editor(
        &self,
        group: &mut TaskGroup,
        args: &SharedArgs,
        extensions: Vec<String>,
        settings: SettingsMap,
    ) {
        if args.skip_ide {
            tracing::debug!("Skipping editor tooling");
            return;
        }
        if !extensions.is_empty() {
            self.add_manager(group, self.editor_manager.clone(), extensions);
        }
        if !settings.is_empty() {
            let editor = self.editor.clone();
            group.add(async move { Outcome::from(editor.update(&settings).await) });
        }
    }

    fn add_manager(&self, group: &mut TaskGroup, manager: PackageManager, packages: Vec<String>) {
        if packages.is_empty() {
            return;
        }
        let runner = self.runner.clone();
        group.add(async move { manager.install(runner.as_ref(), &packages).await });
    }
}
