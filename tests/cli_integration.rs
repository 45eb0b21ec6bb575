//! CLI integration tests
//!
//! These tests run the built binary and check:
//! - Command parsing
//! - Output formats
//! - Exit codes

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Runs the binary with profiles isolated under `home`.
fn antigravity(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_antigravity"))
        .args(args)
        .env("ANTIGRAVITY_PROFILES_DIR", home.join("profiles"))
        .env("ANTIGRAVITY_OUTPUT_DIR", home.join("generated"))
        .env_remove("ANTIGRAVITY_ARCHIVE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute antigravity")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = antigravity(home.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["generate", "validate", "providers", "profiles", "diff"] {
        assert!(text.contains(command), "help does not list {}", command);
    }
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = antigravity(home.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_providers_json() {
    let home = TempDir::new().unwrap();
    let output = antigravity(home.path(), &["providers", "--format", "json"]);

    assert!(output.status.success());
    let providers = json(&output);
    let storage: Vec<&str> = providers["storage"]
        .as_array()
        .expect("storage list")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(storage.contains(&"PostgreSQL"));
    assert!(storage.contains(&"DuckDB"));
}

#[test]
fn test_cli_providers_unknown_category() {
    let home = TempDir::new().unwrap();
    let output = antigravity(home.path(), &["providers", "--category", "lakehouse"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("lakehouse"));
}

#[test]
fn test_cli_validate_invalid_stack() {
    let home = TempDir::new().unwrap();
    let output = antigravity(
        home.path(),
        &[
            "validate",
            "--stack",
            "ingestion=Kafka,storage=PostgreSQL,transformation=dbt",
            "--format",
            "json",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let report = json(&output);
    assert_eq!(report["valid"], false);
    let errors = report["errors"].to_string();
    assert!(errors.contains("Kafka (streaming) is incompatible with dbt (batch)"));
}

#[test]
fn test_cli_validate_suggests_storage() {
    let home = TempDir::new().unwrap();
    let output = antigravity(
        home.path(),
        &["validate", "-s", "transformation=dbt", "-f", "json"],
    );

    assert_eq!(output.status.code(), Some(1));
    let report = json(&output);
    assert!(report["suggestions"]["storage"].is_string());
}

#[test]
fn test_cli_validate_requires_selection() {
    let home = TempDir::new().unwrap();
    let output = antigravity(home.path(), &["validate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No stack given"));
}

#[test]
fn test_cli_generate_writes_project() {
    let home = TempDir::new().unwrap();
    let project = home.path().join("acme");
    let archive = home.path().join("acme.tar.gz");

    let output = antigravity(
        home.path(),
        &[
            "generate",
            "acme",
            "--stack",
            "storage=PostgreSQL,transformation=dbt",
            "--output",
            project.to_str().unwrap(),
            "--archive",
            archive.to_str().unwrap(),
            "--format",
            "json",
        ],
    );

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let summary = json(&output);
    assert_eq!(summary["project"], "acme");
    assert!(project.join("docker-compose.yml").exists());
    assert!(project.join(".antigravity.yml").exists());
    assert!(project.join("dbt_project/profiles.yml").exists());
    assert!(archive.exists());
}

#[test]
fn test_cli_generate_rejects_bad_name() {
    let home = TempDir::new().unwrap();
    let output = antigravity(
        home.path(),
        &["generate", "1-acme", "--stack", "storage=DuckDB"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(!home.path().join("generated").join("1-acme").exists());
}

#[test]
fn test_cli_generate_fatal_stack_writes_nothing() {
    let home = TempDir::new().unwrap();
    let output = antigravity(
        home.path(),
        &["generate", "acme", "--stack", "transformation=dbt"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Storage is required"));
    assert!(!home.path().join("generated").join("acme").exists());
}

#[test]
fn test_cli_generate_from_profile_with_override() {
    let home = TempDir::new().unwrap();
    let output = antigravity(
        home.path(),
        &[
            "generate",
            "starter",
            "--profile",
            "analytics_starter",
            "--stack",
            "orchestration=",
            "-f",
            "json",
        ],
    );

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let project = home.path().join("generated").join("starter");
    assert!(project.join(".antigravity.yml").exists());
    let metadata = fs::read_to_string(project.join(".antigravity.yml")).unwrap();
    assert!(!metadata.contains("Airflow"));
}

#[test]
fn test_cli_diff_against_generated_project() {
    let home = TempDir::new().unwrap();
    let project = home.path().join("acme");
    let generated = antigravity(
        home.path(),
        &["generate", "acme", "-s", "storage=PostgreSQL", "-o", project.to_str().unwrap()],
    );
    assert!(generated.status.success());

    let output = antigravity(
        home.path(),
        &["diff", project.to_str().unwrap(), "-s", "storage=DuckDB,orchestration=Airflow"],
    );

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("+ orchestration=Airflow"));
    assert!(text.contains("~ storage: PostgreSQL -> DuckDB"));
}

#[test]
fn test_cli_profiles_save_list_delete() {
    let home = TempDir::new().unwrap();

    let saved = antigravity(
        home.path(),
        &[
            "profiles",
            "save",
            "team_stack",
            "-s",
            "storage=DuckDB,visualization=Metabase",
            "-d",
            "Local analytics",
            "--tag",
            "local",
        ],
    );
    assert!(saved.status.success(), "{}", String::from_utf8_lossy(&saved.stderr));
    assert!(home.path().join("profiles").join("team_stack.json").exists());

    let listed = antigravity(home.path(), &["profiles", "list", "--tag", "local", "-f", "json"]);
    assert!(listed.status.success());
    let names: Vec<String> = json(&listed)
        .as_array()
        .expect("profile list")
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_string))
        .collect();
    assert!(names.contains(&"team_stack".to_string()));

    let deleted = antigravity(home.path(), &["profiles", "delete", "team_stack"]);
    assert!(deleted.status.success());
    let again = antigravity(home.path(), &["profiles", "delete", "team_stack"]);
    assert_eq!(again.status.code(), Some(1));
}

#[test]
fn test_cli_presets_cannot_be_deleted() {
    let home = TempDir::new().unwrap();
    let output = antigravity(home.path(), &["profiles", "delete", "analytics_starter"]);

    assert_eq!(output.status.code(), Some(1));
}
