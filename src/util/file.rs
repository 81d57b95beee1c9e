use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a list file: one entry per line, trimmed, blank lines dropped.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
