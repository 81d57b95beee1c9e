use super::PackageManager;
use crate::error::DevboxError;
use std::sync::OnceLock;

type Lookup = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Picks the system package manager: the first catalog entry whose executable
/// is on the search path.
pub struct Detector {
    candidates: Vec<PackageManager>,
    lookup: Lookup,
    detected: OnceLock<PackageManager>,
}

impl Detector {
    pub fn new(candidates: Vec<PackageManager>) -> Self {
        Self::with_lookup(candidates, |name| which::which(name).is_ok())
    }

    pub fn with_lookup<F>(candidates: Vec<PackageManager>, lookup: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            candidates,
            lookup: Box::new(lookup),
            detected: OnceLock::new(),
        }
    }

    /// Probe in catalog order. A successful result is cached and later calls
    /// return it without probing again.
    pub fn detect(&self) -> Result<&PackageManager, DevboxError> {
        if let Some(manager) = self.detected.get() {
            return Ok(manager);
        }

        tracing::debug!("Detecting package manager");
        let found = self
            .candidates
            .iter()
            .find(|manager| (self.lookup)(manager.name()))
            .ok_or(DevboxError::NoPackageManager)?;

        tracing::debug!(manager = %found, "Detected package manager");
        Ok(self.detected.get_or_init(|| found.clone()))
    }
}
