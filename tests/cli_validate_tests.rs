//! End-to-end tests for `keymapgen validate` command.

mod fixtures;

use fixtures::*;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Path to the keymapgen binary
fn keymapgen_bin() -> &'static str {
    env!("CARGO_BIN_EXE_keymapgen")
}

/// Runs `keymapgen validate` against `config_dir` with extra arguments.
fn run_validate(temp: &TempDir, config_dir: &Path, extra: &[&str]) -> Output {
    let mut cmd = Command::new(keymapgen_bin());
    cmd.args(["validate", "--config-dir", config_dir.to_str().unwrap()]);
    cmd.args(extra);
    cmd.env("KEYMAPGEN_CONFIG_DIR", temp.path());
    cmd.output().expect("Failed to execute command")
}

#[test]
fn test_validate_valid_configuration() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_basic(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &[]);

    assert_eq!(
        output.status.code(),
        Some(0),
        "Valid configuration should exit with code 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ skeletyl (BastardKB Skeletyl)"));
    assert!(stdout.contains("✓ corne (Corne)"));
    assert!(stdout.contains("✓ All 2 boards valid"));
}

#[test]
fn test_validate_writes_nothing() {
    let (temp, config_dir, output_dir) = setup_config(&keymap_basic(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(!output_dir.exists(), "validate must not create output");
    let entries = fs::read_dir(&config_dir)
        .expect("Failed to read config dir")
        .count();
    assert_eq!(entries, 3, "validate must not touch the config dir");
}

#[test]
fn test_validate_json_output() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_basic(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &["--json"]);

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(json["success"], true);
    let boards = json["boards"].as_array().expect("boards array");
    assert_eq!(boards.len(), 2);
    for board in boards {
        assert_eq!(board["status"], "ok");
        assert!(board["warnings"].as_array().expect("warnings array").is_empty());
    }
}

#[test]
fn test_validate_reports_warnings_without_failing() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_with_warnings(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &[]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("⚠"));
    assert!(stdout.contains("key 'EUR' has no qmk emission"));
    assert!(stdout.contains("✓ All 2 boards valid"));
}

#[test]
fn test_validate_strict_mode_fails_on_warnings() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_with_warnings(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &["--strict"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Warnings found in strict mode"));
}

#[test]
fn test_validate_strict_json_flips_success() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_with_warnings(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &["--strict", "--json"]);

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(json["success"], false);
    let boards = json["boards"].as_array().expect("boards array");
    let skeletyl = boards
        .iter()
        .find(|b| b["id"] == "skeletyl")
        .expect("skeletyl entry");
    assert_eq!(skeletyl["status"], "warnings");
}

#[test]
fn test_validate_reports_failed_board() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_basic(), &boards_with_broken());
    let output = run_validate(&temp, &config_dir, &[]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("✗ boaty"));
    assert!(stdout.contains("✗ 1 of 3 boards failed"));
    assert!(stderr.contains("Validation failed"));
}

#[test]
fn test_validate_board_filter() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_basic(), &boards_with_broken());
    // The broken board is excluded by the filter, so validation passes.
    let output = run_validate(&temp, &config_dir, &["--board", "skeletyl"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ All 1 boards valid"));
    assert!(!stdout.contains("boaty"));
}

#[test]
fn test_validate_unknown_board_fails() {
    let (temp, config_dir, _output_dir) = setup_config(&keymap_basic(), &boards_dual());
    let output = run_validate(&temp, &config_dir, &["--board", "planck"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("board 'planck' is not in the inventory"));
}

#[test]
fn test_validate_missing_config_dir() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config_dir = temp.path().join("nowhere");
    let output = run_validate(&temp, &config_dir, &[]);

    assert_eq!(
        output.status.code(),
        Some(2),
        "Missing config dir should exit with code 2 (I/O error)"
    );
}

#[test]
fn test_validate_empty_board_inventory() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config_dir = temp.path().join("config");
    fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    write_config(&config_dir, &keymap_basic(), "boards: {}\n", &aliases_standard());
    let output = run_validate(&temp, &config_dir, &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no boards"));
}
