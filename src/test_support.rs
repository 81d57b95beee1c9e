//! In-memory collaborators for unit tests.

use crate::editor::{EditorSettings, SettingsMap};
use crate::environment::{EnvMap, EnvStore};
use crate::error::DevboxError;
use crate::export::{ExportKind, Exporter};
use crate::outcome::Outcome;
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records every command and fails those naming one of `failing`.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    failing: Vec<String>,
    missing: Vec<String>,
}

impl RecordingRunner {
    pub fn failing_on(words: &[&str]) -> Self {
        Self {
            failing: words.iter().map(|w| w.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn without_programs(mut self, programs: &[&str]) -> Self {
        self.missing = programs.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, DevboxError> {
        self.calls.lock().unwrap().push(spec.clone());
        let fails = std::iter::once(&spec.program)
            .chain(spec.args.iter())
            .any(|word| self.failing.contains(word));
        Ok(if fails {
            CommandOutput {
                success: false,
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: format!("simulated failure of {}", spec.program),
            }
        } else {
            CommandOutput {
                success: true,
                status: "exit status: 0".to_string(),
                ..CommandOutput::default()
            }
        })
    }

    fn lookup(&self, program: &str) -> Option<PathBuf> {
        if self.missing.iter().any(|m| m == program) {
            None
        } else {
            Some(PathBuf::from("/usr/bin").join(program))
        }
    }
}

/// Exporter that counts what it was asked to do.
pub struct CountingExporter {
    available: bool,
    already: Vec<String>,
    checks: AtomicUsize,
    exports: Mutex<Vec<(ExportKind, String)>>,
}

impl Default for CountingExporter {
    fn default() -> Self {
        Self {
            available: true,
            already: Vec::new(),
            checks: AtomicUsize::new(0),
            exports: Mutex::new(Vec::new()),
        }
    }
}

impl CountingExporter {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    pub fn with_exported(names: &[&str]) -> Self {
        Self {
            already: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn count(&self, kind: ExportKind, name: &str) -> usize {
        self.exports
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, n)| *k == kind && n == name)
            .count()
    }

    pub fn total(&self) -> usize {
        self.exports.lock().unwrap().len()
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exporter for CountingExporter {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn is_exported(&self, _kind: ExportKind, name: &str) -> Result<bool, DevboxError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(DevboxError::ExporterUnavailable);
        }
        Ok(self.already.iter().any(|n| n == name))
    }

    async fn export(&self, kind: ExportKind, name: &str) -> Result<(), DevboxError> {
        if !self.available {
            return Err(DevboxError::ExporterUnavailable);
        }
        self.exports.lock().unwrap().push((kind, name.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEnvStore {
    variables: Mutex<EnvMap>,
    calls: AtomicUsize,
}

impl MemoryEnvStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.variables.lock().unwrap().get(key).cloned()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvStore for MemoryEnvStore {
    async fn set(&self, maps: &[&EnvMap]) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut variables = self.variables.lock().unwrap();
        for map in maps {
            for (key, value) in map.iter() {
                variables.insert(key.clone(), value.clone());
            }
        }
        Outcome::Ok
    }
}

#[derive(Default)]
pub struct MemoryEditorSettings {
    settings: Mutex<SettingsMap>,
    updates: AtomicUsize,
}

impl MemoryEditorSettings {
    pub fn settings(&self) -> SettingsMap {
        self.settings.lock().unwrap().clone()
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EditorSettings for MemoryEditorSettings {
    async fn update(&self, settings: &SettingsMap) -> Result<(), DevboxError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut current = self.settings.lock().unwrap();
        for (key, value) in settings {
            current.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
