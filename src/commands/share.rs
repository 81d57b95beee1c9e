use crate::config::Settings;
use crate::toolchain::{SharedArgs, Toolchain};
use crate::ui;
use anyhow::Result;

pub async fn execute(settings: &Settings, args: &SharedArgs, packages: Vec<String>) -> Result<()> {
    let toolchain = shared_packages(packages);
    let installer = super::build_installer(settings)?;

    let progress = ui::Progress::new("Sharing", toolchain.packages.join(", "));
    let outcome = installer.install(&toolchain, args).await;
    super::finish(progress, outcome)
}

/// Ad-hoc toolchain: each package is installed and exported as a binary of
/// the same name.
fn shared_packages(packages: Vec<String>) -> Toolchain {
    let mut toolchain = Toolchain::new("share", "Shared system packages");
    toolchain.binaries = packages.clone();
    toolchain.packages = packages;
    toolchain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packages_are_exported_as_binaries() {
        let toolchain = shared_packages(vec!["htop".to_string(), "ripgrep".to_string()]);
        assert_eq!(toolchain.packages, vec!["htop", "ripgrep"]);
        assert_eq!(toolchain.binaries, toolchain.packages);
        assert!(toolchain.editor_extensions.is_empty());
        assert!(toolchain.post_install.is_none());
    }
}
