use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

fn devbox(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("devbox").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("HOME", temp.path())
        .env_remove("DEVBOX_ENV_FILE")
        .env_remove("DEVBOX_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let temp = TempDir::new().unwrap();
    devbox(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("--skip-ide"));
}

#[test]
#[serial]
fn test_list_shows_builtin_toolchains() {
    let temp = TempDir::new().unwrap();
    devbox(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("golang"))
        .stdout(predicate::str::contains("rust"))
        .stdout(predicate::str::contains("kubernetes"));
}

#[test]
#[serial]
fn test_list_includes_config_toolchains() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("config/devbox");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[toolchains.zig]\ndescription = \"Zig compiler\"\npackages = [\"zig\"]\n",
    )
    .unwrap();

    devbox(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Zig compiler"));
}

#[test]
#[serial]
fn test_explicit_config_flag() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("custom.toml");
    fs::write(&config, "[toolchains.haskell]\ndescription = \"GHC and cabal\"\n").unwrap();

    devbox(&temp)
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("GHC and cabal"));
}

#[test]
#[serial]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("broken.toml");
    fs::write(&config, "command_timeout = \"soon\"").unwrap();

    devbox(&temp)
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.toml"));
}

#[test]
#[serial]
fn test_install_without_toolchains() {
    let temp = TempDir::new().unwrap();
    devbox(&temp)
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no toolchains specified"));
}

#[test]
#[serial]
fn test_install_unknown_toolchains_reported_together() {
    let temp = TempDir::new().unwrap();
    devbox(&temp)
        .args(["install", "golang", "cobol", "fortran"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown toolchain(s): cobol, fortran"));
}

#[test]
#[serial]
fn test_install_unknown_name_from_file() {
    let temp = TempDir::new().unwrap();
    let list = temp.path().join("toolchains.txt");
    fs::write(&list, "\n  cobol  \n").unwrap();

    devbox(&temp)
        .arg("install")
        .arg("--file")
        .arg(&list)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown toolchain(s): cobol"));
}

#[test]
#[serial]
fn test_blank_env_file_path() {
    let temp = TempDir::new().unwrap();
    devbox(&temp)
        .env("DEVBOX_ENV_FILE", "   ")
        .args(["install", "golang"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment file path is empty"));
}

#[test]
#[serial]
fn test_no_package_manager_on_path() {
    let temp = TempDir::new().unwrap();
    let empty_path = temp.path().join("bin");
    fs::create_dir_all(&empty_path).unwrap();
    let env_file = temp.path().join("env/devbox.zsh");

    devbox(&temp)
        .env("PATH", &empty_path)
        .env("DEVBOX_ENV_FILE", &env_file)
        .args(["install", "golang"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no supported package manager found"));

    // The environment file is prepared before detection.
    assert!(env_file.exists());
}

#[test]
#[serial]
fn test_env_file_directory_rejected() {
    let temp = TempDir::new().unwrap();
    devbox(&temp)
        .env("DEVBOX_ENV_FILE", temp.path())
        .arg("setup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid environment file"));
}

#[test]
fn test_share_requires_packages() {
    let temp = TempDir::new().unwrap();
    devbox(&temp).arg("share").assert().failure();
}
