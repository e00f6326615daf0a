//! Integration tests for the omrs-sync CLI
//!
//! These tests verify the CLI behavior end-to-end

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Helper function to create a test CLI command
#[allow(deprecated)]
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("omrs-sync").unwrap();
    cmd.current_dir(dir).env_remove("OCL_API_TOKEN");
    cmd
}

/// Temporary directory holding a small export
fn create_test_export() -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    fs::write(
        temp_dir.path().join("sources.json"),
        r#"{"name":"CIEL","description":"CIEL","creator":1,"retired":false,"retired_by":null,"uuid":"src-ciel","hl7":null}
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("classes.json"),
        r#"{"name":"Question","description":"Question","creator":1,"retired":false,"retired_by":null,"uuid":"class-question"}
{"name":"Misc","description":"Misc","creator":1,"retired":false,"retired_by":null,"uuid":"class-misc"}
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("concepts.json"),
        r#"{"id":"1","concept_class":"Question","datatype":"Coded","names":[{"name":"Pregnant","name_type":"FULLY_SPECIFIED","locale":"en","locale_preferred":true}],"retired":false,"external_id":"c-1"}
{"id":"2","concept_class":"Misc","datatype":"N/A","names":[{"name":"Yes","name_type":"FULLY_SPECIFIED","locale":"en","locale_preferred":true}],"retired":false,"external_id":"c-2"}
{"id":"3","concept_class":"Misc","datatype":"N/A","names":[{"name":"Unknown (old)","name_type":"FULLY_SPECIFIED","locale":"en","locale_preferred":true}],"retired":true,"external_id":"c-3"}
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("mappings.json"),
        r#"{"from_concept_url":"/orgs/CIEL/sources/CIEL/concepts/1/","to_concept_url":"/orgs/CIEL/sources/CIEL/concepts/2/","map_type":"Q-AND-A","sort_weight":1,"external_id":"m-1","retired":false}
"#,
    )
    .unwrap();

    temp_dir
}

fn sync_all(dir: &Path) -> Command {
    let mut cmd = cli(dir);
    cmd.args([
        "sync",
        "--source-file",
        "sources.json",
        "--class-file",
        "classes.json",
        "--concept-file",
        "concepts.json",
        "--mapping-file",
        "mappings.json",
    ]);
    cmd
}

#[test]
fn test_help_command() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check-sources"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn test_version_command() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(VERSION));
}

#[test]
fn test_sync_json_summary() {
    let temp_dir = create_test_export();

    sync_all(temp_dir.path())
        .args(["--database", "openmrs.db", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""conceptsExported": 3"#))
        .stdout(predicate::str::contains(r#""answersExported": 1"#))
        .stdout(predicate::str::contains(r#""retiredConceptsExported": 1"#));

    assert!(temp_dir.path().join("openmrs.db").exists());

    sync_all(temp_dir.path())
        .args(["--database", "openmrs.db", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""answersExported": 0"#))
        .stdout(predicate::str::contains(r#""classesExported": 0"#));
}

#[test]
fn test_database_from_config_file() {
    let temp_dir = create_test_export();
    fs::write(
        temp_dir.path().join("omrs-sync.yaml"),
        "database:\n  path: configured.db\n",
    )
    .unwrap();

    sync_all(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary:"));

    assert!(temp_dir.path().join("configured.db").exists());
}

#[test]
fn test_dry_run_without_database() {
    let temp_dir = create_test_export();

    sync_all(temp_dir.path())
        .args(["--dry-run", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""dryRun": true"#));
}

#[test]
fn test_missing_database_fails() {
    let temp_dir = create_test_export();

    sync_all(temp_dir.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_retired_listing() {
    let temp_dir = create_test_export();

    cli(temp_dir.path())
        .args(["sync", "--concept-file", "concepts.json", "--retired"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown (old)"))
        .stdout(predicate::str::contains("1 retired concept(s)"));
}

#[test]
fn test_unknown_concept_filter_fails() {
    let temp_dir = create_test_export();

    sync_all(temp_dir.path())
        .args(["--dry-run", "--concept-id", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("999"));
}

#[test]
fn test_sync_without_files_fails() {
    let temp_dir = TempDir::new().unwrap();

    cli(temp_dir.path())
        .args(["sync", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to import"));
}

#[test]
fn test_check_sources_without_token() {
    let temp_dir = create_test_export();

    sync_all(temp_dir.path())
        .args(["--database", "openmrs.db"])
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["check-sources", "--database", "openmrs.db", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "unchecked""#))
        .stdout(predicate::str::contains(r#""owner": "CIEL""#));
}

#[test]
fn test_config_schema() {
    let temp_dir = TempDir::new().unwrap();

    cli(temp_dir.path())
        .args(["config", "schema"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SyncConfig"));
}

#[test]
fn test_config_show_explicit_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    fs::write(&config_path, "[catalog]\nenv = \"dev\"\n").unwrap();

    cli(temp_dir.path())
        .args(["--config", "custom.toml", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""env": "dev""#));
}

#[test]
fn test_generate_completion() {
    let temp_dir = TempDir::new().unwrap();

    cli(temp_dir.path())
        .args(["--generate-completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("omrs-sync"));
}
