use crate::config::Settings;
use crate::toolchain::{Catalog, SharedArgs};
use crate::ui;
use crate::util::file::read_lines;
use anyhow::Result;
use std::path::PathBuf;

pub async fn execute(
    settings: &Settings,
    catalog: &Catalog,
    args: &SharedArgs,
    names: Vec<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let names = requested_names(names, file)?;
    let toolchains = catalog.resolve(&names)?;
    let installer = super::build_installer(settings)?;

    let listed: Vec<&str> = toolchains.iter().map(|t| t.name.as_str()).collect();
    let progress = ui::Progress::new("Installing", listed.join(", "));
    let outcome = installer.install_many(&toolchains, args).await;
    super::finish(progress, outcome)
}

/// Positional names first, then the ones listed in `file`.
fn requested_names(mut names: Vec<String>, file: Option<PathBuf>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let listed = read_lines(&path)?;
        tracing::debug!(path = ?path, count = listed.len(), "Read toolchain names from file");
        names.extend(listed);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_names_follow_positional_names() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("toolchains");
        fs::write(&path, "rust\n\n  python \n").unwrap();

        let names = requested_names(vec!["golang".to_string()], Some(path)).unwrap();
        assert_eq!(names, vec!["golang", "rust", "python"]);
    }

    #[test]
    fn test_without_file() {
        let names = requested_names(vec!["node".to_string()], None).unwrap();
        assert_eq!(names, vec!["node"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(requested_names(Vec::new(), Some(temp.path().join("missing"))).is_err());
    }
}
