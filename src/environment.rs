use crate::error::DevboxError;
use crate::outcome::Outcome;
use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Variable name to value expression, in declaration order. Values are
/// written verbatim and evaluated by the shell that sources the file, so a
/// value may refer to any variable declared before it.
pub type EnvMap = IndexMap<String, String>;

/// Format one variable assignment
pub fn format_line(key: &str, value: &str) -> String {
    format!("export {key}=\"{value}\"")
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*export\s+([A-Za-z_][A-Za-z0-9_]*)=(.*)$")
            .unwrap_or_else(|e| unreachable!("invalid pattern: {e}"))
    })
}

/// Parse one `export KEY=VALUE` line. Other lines are ignored.
pub fn parse_line(line: &str) -> Option<(String, String)> {
    let captures = line_pattern().captures(line)?;
    let key = captures.get(1)?.as_str().to_string();
    let value = unquote(captures.get(2)?.as_str().trim()).to_string();
    Some((key, value))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Merge maps in order. Later maps win on value, a key keeps the position
/// where it was first declared.
pub fn merge(maps: &[&EnvMap]) -> EnvMap {
    let mut merged = EnvMap::new();
    for map in maps {
        for (key, value) in map.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Expand a value against the process environment. `None` when something
/// is left that only a shell can evaluate: command substitution, nested
/// defaults or an unset variable.
fn expand_fully(value: &str) -> Option<String> {
    let expanded = shellexpand::full(value).ok()?;
    if expanded.contains(&['$', '`', '{', '}'][..]) {
        return None;
    }
    Some(expanded.into_owned())
}

/// Persists environment variables.
#[async_trait]
pub trait EnvStore: Send + Sync {
    /// Merge `maps` in order (later maps win) and persist every key that is
    /// new or changed. Setting an identical value again is a no-op.
    async fn set(&self, maps: &[&EnvMap]) -> Outcome;
}

/// A shell file sourced by the user's shell, for example
/// `~/.oh-my-zsh/custom/00-env-devbox.zsh`.
///
/// Changed variables are appended as new lines, so the last assignment in the
/// file wins when it is sourced.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    variables: Arc<Mutex<EnvMap>>,
}

impl EnvFile {
    /// Open or create the file and load the variables it already sets.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DevboxError> {
        let path = path.into();
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(DevboxError::EmptyEnvFilePath);
        }

        let invalid = |reason: &str| DevboxError::InvalidEnvFile {
            path: path.clone(),
            reason: reason.to_string(),
        };
        let io_error = |source| DevboxError::EnvFileIo {
            path: path.clone(),
            source,
        };

        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => return Err(invalid("points to a directory")),
            Ok(meta) if !meta.is_file() => return Err(invalid("not a regular file")),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(io_error)?;
                }
                create_private(&path).map_err(io_error)?;
                tracing::info!(file = %path.display(), "Created environment file");
            }
            Err(e) => return Err(io_error(e)),
        }

        let contents = fs::read_to_string(&path).map_err(io_error)?;
        let variables: EnvMap = contents.lines().filter_map(parse_line).collect();
        tracing::debug!(
            file = %path.display(),
            count = variables.len(),
            "Found existing environment variables"
        );

        Ok(Self {
            path,
            variables: Arc::new(Mutex::new(variables)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current value of a variable as persisted.
    pub fn get(&self, key: &str) -> Option<String> {
        self.variables
            .lock()
            .ok()
            .and_then(|vars| vars.get(key).cloned())
    }

    /// Blocking part of [`EnvStore::set`]: file I/O and process environment.
    fn apply(&self, mut changes: EnvMap) -> Outcome {
        let mut variables = match self.variables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        changes.retain(|key, value| variables.get(key) != Some(&*value));
        if changes.is_empty() {
            return Outcome::Ok;
        }

        tracing::info!(
            file = %self.path.display(),
            variables = ?changes.keys().collect::<Vec<_>>(),
            "Appending environment variables"
        );
        if let Err(error) = self.append(&changes) {
            return error.into();
        }

        // In declaration order, so a value can use one exported just before.
        for (key, value) in &changes {
            match expand_fully(value) {
                Some(expanded) => {
                    tracing::debug!(key = %key, value = %expanded, "Setting process environment");
                    std::env::set_var(key, expanded);
                }
                None => tracing::warn!(
                    key = %key,
                    value = %value,
                    "Value needs a shell to evaluate, not exported to this process"
                ),
            }
        }
        variables.extend(changes);
        Outcome::Ok
    }

    fn append(&self, changes: &EnvMap) -> Result<(), DevboxError> {
        let io_error = |source| DevboxError::EnvFileIo {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;

        let mut contents = String::new();
        for (key, value) in changes {
            contents.push_str(&format_line(key, value));
            contents.push('\n');
        }
        if !ends_with_newline(&mut file).map_err(io_error)? {
            contents.insert(0, '\n');
        }

        file.write_all(contents.as_bytes()).map_err(io_error)
    }
}

#[async_trait]
impl EnvStore for EnvFile {
    async fn set(&self, maps: &[&EnvMap]) -> Outcome {
        let changes = merge(maps);
        let file = self.clone();
        match tokio::task::spawn_blocking(move || file.apply(changes)).await {
            Ok(outcome) => outcome,
            Err(error) => DevboxError::TaskFailed(error.to_string()).into(),
        }
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    fn env_map(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    #[case("export EDITOR=\"vim\"", Some(("EDITOR", "vim")))]
    #[case("export EDITOR='vim'", Some(("EDITOR", "vim")))]
    #[case("  export LANG=en_US.UTF-8", Some(("LANG", "en_US.UTF-8")))]
    #[case("# export COMMENTED=1", None)]
    #[case("alias ll='ls -l'", None)]
    #[case("set -gx EDITOR vim", None)]
    fn test_parse_line(#[case] line: &str, #[case] expected: Option<(&str, &str)>) {
        let expected = expected.map(|(k, v)| (k.to_string(), v.to_string()));
        assert_eq!(parse_line(line), expected);
    }

    #[test]
    fn test_written_lines_parse_back() {
        let line = format_line("GOPATH", "${GOPATH:-${XDG_DATA_HOME}/go}");
        assert_eq!(line, "export GOPATH=\"${GOPATH:-${XDG_DATA_HOME}/go}\"");
        assert_eq!(
            parse_line(&line),
            Some((
                "GOPATH".to_string(),
                "${GOPATH:-${XDG_DATA_HOME}/go}".to_string()
            ))
        );
    }

    #[test]
    fn test_merge_keeps_first_position_and_last_value() {
        let first = env_map(&[("XDG_DATA_HOME", "a"), ("GOPATH", "b")]);
        let second = env_map(&[("CARGO_HOME", "c"), ("XDG_DATA_HOME", "d")]);
        let merged = merge(&[&first, &second]);

        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["XDG_DATA_HOME", "GOPATH", "CARGO_HOME"]);
        assert_eq!(merged["XDG_DATA_HOME"], "d");
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let error = EnvFile::open("  ").unwrap_err();
        assert!(matches!(error, DevboxError::EmptyEnvFilePath));
    }

    #[test]
    fn test_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let error = EnvFile::open(temp.path()).unwrap_err();
        assert!(matches!(error, DevboxError::InvalidEnvFile { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn test_set_twice_writes_one_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom/00-env-devbox.zsh");
        let file = EnvFile::open(&path).unwrap();
        let vars = env_map(&[("DEVBOX_TEST_K", "v")]);

        assert!(file.set(&[&vars]).await.is_ok());
        assert!(file.set(&[&vars]).await.is_ok());

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "export DEVBOX_TEST_K=\"v\"\n");
        assert_eq!(env::var("DEVBOX_TEST_K").unwrap(), "v");
    }

    #[tokio::test]
    #[serial]
    async fn test_existing_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.zsh");
        fs::write(&path, "export DEVBOX_TEST_OLD=\"1\"").unwrap();

        let file = EnvFile::open(&path).unwrap();
        assert_eq!(file.get("DEVBOX_TEST_OLD").as_deref(), Some("1"));

        let vars = env_map(&[("DEVBOX_TEST_OLD", "1"), ("DEVBOX_TEST_NEW", "2")]);
        assert!(file.set(&[&vars]).await.is_ok());

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "export DEVBOX_TEST_OLD=\"1\"\nexport DEVBOX_TEST_NEW=\"2\"\n"
        );

        let reopened = EnvFile::open(&path).unwrap();
        assert_eq!(reopened.get("DEVBOX_TEST_NEW").as_deref(), Some("2"));
    }

    #[tokio::test]
    #[serial]
    async fn test_lines_keep_declaration_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.zsh");
        let file = EnvFile::open(&path).unwrap();

        let defaults = env_map(&[
            ("DEVBOX_TEST_DATA", "${DEVBOX_TEST_DATA:-$HOME/.local/share}"),
            ("DEVBOX_TEST_GOPATH", "${DEVBOX_TEST_GOPATH:-${DEVBOX_TEST_DATA}/go}"),
        ]);
        let cargo = env_map(&[("DEVBOX_TEST_CARGO", "${DEVBOX_TEST_DATA}/cargo")]);
        assert!(file.set(&[&defaults, &cargo]).await.is_ok());

        let keys: Vec<String> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .filter_map(parse_line)
            .map(|(key, _)| key)
            .collect();
        assert_eq!(
            keys,
            vec!["DEVBOX_TEST_DATA", "DEVBOX_TEST_GOPATH", "DEVBOX_TEST_CARGO"]
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_later_maps_win_and_plain_values_expand() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.zsh");
        env::set_var("DEVBOX_TEST_BASE", "/opt/base");

        let file = EnvFile::open(&path).unwrap();
        let first = env_map(&[("DEVBOX_TEST_DIR", "first")]);
        let second = env_map(&[("DEVBOX_TEST_DIR", "$DEVBOX_TEST_BASE/bin")]);
        assert!(file.set(&[&first, &second]).await.is_ok());

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "export DEVBOX_TEST_DIR=\"$DEVBOX_TEST_BASE/bin\"\n");
        assert_eq!(env::var("DEVBOX_TEST_DIR").unwrap(), "/opt/base/bin");
        env::remove_var("DEVBOX_TEST_BASE");
    }

    #[tokio::test]
    #[serial]
    async fn test_shell_only_values_are_not_exported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.zsh");
        env::set_var("DEVBOX_TEST_XDG_DATA", "/home/dev/.local/share");
        env::set_var("DEVBOX_TEST_CONFIG", "/home/dev/.config");
        for key in [
            "DEVBOX_TEST_GOPATH",
            "DEVBOX_TEST_PROCS",
            "DEVBOX_TEST_STATE",
            "DEVBOX_TEST_CONF",
        ] {
            env::remove_var(key);
        }
        env::remove_var("DEVBOX_TEST_UNSET");

        let file = EnvFile::open(&path).unwrap();
        let vars = env_map(&[
            (
                "DEVBOX_TEST_GOPATH",
                "${DEVBOX_TEST_GOPATH:-${DEVBOX_TEST_XDG_DATA}/go}",
            ),
            ("DEVBOX_TEST_PROCS", "${DEVBOX_TEST_PROCS:-$(nproc)}"),
            ("DEVBOX_TEST_STATE", "${DEVBOX_TEST_UNSET:-$HOME/.local/state}"),
            ("DEVBOX_TEST_CONF", "${DEVBOX_TEST_CONFIG:-$HOME/.config}"),
        ]);
        assert!(file.set(&[&vars]).await.is_ok());

        // Everything is persisted verbatim for the shell.
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("export DEVBOX_TEST_PROCS=\"${DEVBOX_TEST_PROCS:-$(nproc)}\""));
        assert_eq!(contents.lines().count(), 4);

        // Only fully expanded values reach the process.
        assert!(env::var("DEVBOX_TEST_GOPATH").is_err());
        assert!(env::var("DEVBOX_TEST_PROCS").is_err());
        assert!(env::var("DEVBOX_TEST_STATE").is_err());
        assert_eq!(env::var("DEVBOX_TEST_CONF").unwrap(), "/home/dev/.config");

        env::remove_var("DEVBOX_TEST_XDG_DATA");
        env::remove_var("DEVBOX_TEST_CONFIG");
        env::remove_var("DEVBOX_TEST_CONF");
    }

    #[rstest]
    #[case("plain", Some("plain"))]
    #[case("${DEVBOX_TEST_NEVER_SET:-fallback}", Some("fallback"))]
    #[case("$(uname -m)", None)]
    #[case("`id -u`", None)]
    #[case("$DEVBOX_TEST_NEVER_SET/bin", None)]
    #[case("${A:-${B}/go}", None)]
    fn test_expand_fully(#[case] value: &str, #[case] expected: Option<&str>) {
        assert_eq!(expand_fully(value).as_deref(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.zsh");
        EnvFile::open(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
