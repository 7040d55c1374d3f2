//! CLI parsing tests for the compsync command
//!
//! Tests that verify CLI argument parsing works correctly.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the compsync binary
#[allow(deprecated)]
fn compsync() -> Command {
    Command::cargo_bin("compsync").expect("Failed to find compsync binary")
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    compsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("map"))
        .stdout(predicate::str::contains("copy"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_flag() {
    compsync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("compsync"));
}

// ============================================================================
// Global Options Tests
// ============================================================================

#[test]
fn test_global_options_in_help() {
    compsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--theme"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"));
}

#[test]
fn test_global_options_after_subcommand() {
    compsync()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--theme"))
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// Subcommand Tests
// ============================================================================

#[test]
fn test_map_help_shows_policy_flags() {
    compsync()
        .args(["map", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<COLLECTION>"))
        .stdout(predicate::str::contains("--components"))
        .stdout(predicate::str::contains("--ignore-conflicts"))
        .stdout(predicate::str::contains("--ignore-overrides"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_install_help_shows_setup_files() {
    compsync()
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--setup-files"))
        .stdout(predicate::str::contains("--ignore-conflicts"));
}

#[test]
fn test_copy_help() {
    compsync()
        .args(["copy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--setup-files"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_map_requires_collection() {
    compsync()
        .arg("map")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<COLLECTION>"));
}

#[test]
fn test_unknown_subcommand_fails() {
    compsync()
        .arg("sync-everything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_missing_theme_dir_fails() {
    compsync()
        .args(["--theme", "/nonexistent/compsync/theme", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Theme directory not found"));
}
