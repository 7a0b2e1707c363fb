//! Tests of the `appup` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn appup() -> Command {
    let mut cmd = Command::cargo_bin("appup").unwrap();
    cmd.env_remove("APPUP_CONFIG").env_remove("APPUP_TOKEN").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("appup.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    appup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("menu"));
}

#[test]
fn test_version_shows_recorded_version() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("version.txt"), "# Widget version record\nversion=1.4.0\n").unwrap();
    let config = write_config(&dir, "app_name = \"Widget\"\n");

    appup()
        .arg("--config")
        .arg(&config)
        .arg("--install-dir")
        .arg(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Widget 1.4.0"))
        .stdout(predicate::str::contains("version.txt"));
}

#[test]
fn test_version_without_record() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "app_name = \"Widget\"\n");

    appup()
        .arg("--config")
        .arg(&config)
        .arg("--install-dir")
        .arg(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Widget: no version recorded"));

    // Showing the version never creates the record
    assert!(!dir.path().join("version.txt").exists());
}

#[test]
fn test_status_without_repository_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    appup()
        .arg("--config")
        .arg(&config)
        .arg("--install-dir")
        .arg(dir.path())
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no repository configured"));
}

#[test]
fn test_invalid_repository_override_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "repository = \"acme/widget\"\n");

    appup()
        .arg("--config")
        .arg(&config)
        .args(["--repo", "not a repo", "--no-progress", "check", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("owner/repo"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();

    appup()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("version")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "repository = [unterminated\n");

    appup().arg("--config").arg(&config).arg("version").assert().code(1);
}

#[test]
fn test_config_path_from_environment() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("version.txt"), "version=3.1.4\n").unwrap();
    let config = write_config(
        &dir,
        &format!(
            "app_name = \"Gadget\"\ninstall_dir = \"{}\"\n",
            dir.path().display().to_string().replace('\\', "/")
        ),
    );

    appup()
        .env("APPUP_CONFIG", &config)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gadget 3.1.4"));
}

#[test]
fn test_menu_exits_on_request() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("version.txt"), "version=2.0.0\n").unwrap();
    let config = write_config(&dir, "app_name = \"Widget\"\n");

    appup()
        .arg("--config")
        .arg(&config)
        .arg("--install-dir")
        .arg(dir.path())
        .write_stdin("2\nbogus\n3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1) Check for updates"))
        .stdout(predicate::str::contains("Widget 2.0.0"))
        .stdout(predicate::str::contains("Unknown option 'bogus'"));
}
