use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

/// Command isolated from the user's configuration and data
fn orgsync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("orgsync").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("NO_COLOR", "1")
        .env_remove("ORGSYNC_CATALOG_TOKEN");
    cmd
}

fn write_export(home: &TempDir, records: serde_json::Value) -> std::path::PathBuf {
    let path = home.path().join("org_units.json");
    fs::write(&path, records.to_string()).unwrap();
    path
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("mapping"));
}

#[test]
fn test_completions_for_bash() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orgsync"));
}

#[test]
fn test_unknown_subcommand_is_misuse() {
    let home = TempDir::new().unwrap();
    orgsync(&home).arg("frobnicate").assert().code(2);
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .args(["config", "set", "sync.batch_size", "25"])
        .assert()
        .success();

    assert!(home.path().join("config/orgsync/config.toml").exists());
    orgsync(&home)
        .args(["config", "get", "sync.batch_size"])
        .assert()
        .success()
        .stdout("25\n");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .args(["config", "set", "sync.batch_size", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage Error"));
}

#[test]
fn test_env_overrides_config() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .env("ORGSYNC_CATALOG__SCHEME", "departments")
        .args(["config", "get", "catalog.scheme"])
        .assert()
        .success()
        .stdout("departments\n");
}

#[test]
fn test_validate_reports_levels() {
    let home = TempDir::new().unwrap();
    let export = write_export(
        &home,
        json!({"results": [
            {"id": 1, "title": "Council", "parent_id": null},
            {"id": 2, "title": "Finance", "parent_id": 1},
            {"id": 3, "title": "Payroll", "parent_id": 2}
        ]}),
    );

    orgsync(&home)
        .env("ORGSYNC_DIRECTORY__PATH", &export)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 units"))
        .stdout(predicate::str::contains("depth: 3"));
}

#[test]
fn test_validate_rejects_cycle() {
    let home = TempDir::new().unwrap();
    let export = write_export(
        &home,
        json!([
            {"id": "A", "title": "Alpha", "parent_id": "B"},
            {"id": "B", "title": "Beta", "parent_id": "A"}
        ]),
    );

    orgsync(&home)
        .env("ORGSYNC_DIRECTORY__PATH", &export)
        .arg("validate")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Data Integrity Error"));
}

#[test]
fn test_missing_export_is_network_class_error() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .env("ORGSYNC_DIRECTORY__PATH", home.path().join("absent.json"))
        .arg("validate")
        .assert()
        .code(3);
}

#[test]
fn test_mapping_show_without_entries() {
    let home = TempDir::new().unwrap();
    orgsync(&home)
        .args(["mapping", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No mapping entries"));
}
