use crate::config::Settings;
use crate::toolchain::{Catalog, SharedArgs, Toolchain, DEFAULT_IDE};
use crate::ui;
use anyhow::Result;

pub async fn execute(settings: &Settings, catalog: &Catalog, args: &SharedArgs) -> Result<()> {
    let toolchain = setup_toolchain(catalog, args);
    let installer = super::build_installer(settings)?;

    let progress = ui::Progress::new("Setting up", "development container");
    let outcome = installer.install(&toolchain, args).await;
    super::finish(progress, outcome)
}

/// The setup toolchain as installed: the editor is added to the package and
/// export lists unless editor tooling is skipped, and the environment of
/// every known toolchain is persisted after the defaults. Defaults keep their
/// place and value on key collisions, so later lines can refer to them.
fn setup_toolchain(catalog: &Catalog, args: &SharedArgs) -> Toolchain {
    let base = catalog.setup();
    let mut toolchain = base.clone();

    if !args.skip_ide {
        for list in [
            &mut toolchain.packages,
            &mut toolchain.binaries,
            &mut toolchain.applications,
        ] {
            if !list.iter().any(|item| item == DEFAULT_IDE) {
                list.push(DEFAULT_IDE.to_string());
            }
        }
    }

    for other in catalog.iter() {
        for (key, value) in &other.environment {
            toolchain
                .environment
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    toolchain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_added_when_enabled() {
        let catalog = Catalog::builtin();
        let toolchain = setup_toolchain(&catalog, &SharedArgs::default());

        assert_eq!(toolchain.packages.last().map(String::as_str), Some(DEFAULT_IDE));
        assert!(toolchain.binaries.iter().any(|b| b == DEFAULT_IDE));
        assert!(toolchain.applications.iter().any(|a| a == DEFAULT_IDE));
        // The catalog itself is untouched.
        assert!(!catalog.setup().binaries.iter().any(|b| b == DEFAULT_IDE));
    }

    #[test]
    fn test_editor_skipped() {
        let catalog = Catalog::builtin();
        let args = SharedArgs {
            skip_ide: true,
            no_export: false,
        };
        let toolchain = setup_toolchain(&catalog, &args);

        assert!(!toolchain.packages.iter().any(|p| p == DEFAULT_IDE));
        assert!(toolchain.applications.is_empty());
    }

    #[test]
    fn test_environment_covers_every_toolchain() {
        let catalog = Catalog::builtin();
        let toolchain = setup_toolchain(&catalog, &SharedArgs::default());

        for other in catalog.iter() {
            for key in other.environment.keys() {
                assert!(toolchain.environment.contains_key(key), "missing {key}");
            }
        }
        for (key, value) in &catalog.setup().environment {
            assert_eq!(toolchain.environment.get(key), Some(value));
        }
    }

    #[test]
    fn test_defaults_precede_toolchain_variables() {
        let catalog = Catalog::builtin();
        let toolchain = setup_toolchain(&catalog, &SharedArgs::default());
        let position = |key: &str| toolchain.environment.get_index_of(key).unwrap();

        assert_eq!(toolchain.environment.keys().next().map(String::as_str), Some("XDG_CONFIG_HOME"));
        assert!(position("XDG_DATA_HOME") < position("GOPATH"));
        assert!(position("XDG_DATA_HOME") < position("CARGO_HOME"));
        assert!(position("XDG_DATA_HOME") < position("KREW_ROOT"));
    }
}
