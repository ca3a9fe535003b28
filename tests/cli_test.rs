use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use forest_stand_simulator::{io::write_trees_csv, models::Tree};

/// Write a small measured tree list to a CSV file in the given directory.
fn create_tree_list(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("stand.csv");
    let trees = vec![
        Tree::new(1, "LP", 8.4, 55.0, 18, 0.45, 120.0),
        Tree::new(2, "LP", 6.0, 46.0, 18, 0.5, 150.0),
        Tree::new(3, "LP", 3.1, 28.0, 18, 0.6, 90.0),
        Tree::new(4, "LP", 1.2, 12.0, 18, 0.7, 40.0),
    ];
    write_trees_csv(&trees, &path).unwrap();
    path
}

fn cmd() -> Command {
    Command::cargo_bin("stand-sim").unwrap()
}

// --- Simulate subcommand ---

#[test]
fn test_simulate_planted_defaults() {
    cmd()
        .args(["simulate", "--tpa", "100", "--years", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stand Development"))
        .stdout(predicate::str::contains("Period Summary"))
        .stdout(predicate::str::contains("Seed: 42"));
}

#[test]
fn test_simulate_from_tree_list() {
    let dir = TempDir::new().unwrap();
    let csv_path = create_tree_list(&dir);

    cmd()
        .args([
            "simulate",
            "--input",
            csv_path.to_str().unwrap(),
            "--years",
            "15",
            "--histogram",
            "--class-width",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 records"))
        .stdout(predicate::str::contains("Diameter Distribution"));
}

#[test]
fn test_simulate_writes_outputs() {
    let dir = TempDir::new().unwrap();
    let metrics_path = dir.path().join("metrics.json");
    let trees_path = dir.path().join("trees.xlsx");

    cmd()
        .args([
            "simulate",
            "--tpa",
            "60",
            "--years",
            "10",
            "--output",
            metrics_path.to_str().unwrap(),
            "--trees-out",
            trees_path.to_str().unwrap(),
            "--pretty",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success"));

    assert!(metrics_path.exists());
    assert!(trees_path.exists());
    let content = std::fs::read_to_string(&metrics_path).unwrap();
    assert!(content.contains("\"volume_cuft\""));
}

#[test]
fn test_simulate_with_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("sim.toml");
    std::fs::write(&config_path, "[growth]\ntime_step = 10\n").unwrap();

    cmd()
        .args([
            "simulate",
            "--tpa",
            "50",
            "--years",
            "15",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a multiple"));
}

#[test]
fn test_simulate_unknown_species() {
    cmd()
        .args(["simulate", "--species", "ZZ", "--tpa", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Species not found"))
        .stderr(predicate::str::contains("ZZ"));
}

#[test]
fn test_simulate_bad_site_index() {
    cmd()
        .args(["simulate", "--site-index", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Site index"));
}

#[test]
fn test_simulate_unsupported_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stand.txt");
    std::fs::write(&path, "dbh\n4.0\n").unwrap();

    cmd()
        .args(["simulate", "--input", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn test_simulate_missing_input_file() {
    cmd()
        .args(["simulate", "--input", "nonexistent.csv"])
        .assert()
        .failure();
}

// --- Grow-tree subcommand ---

#[test]
fn test_grow_tree_seedling() {
    cmd()
        .args(["grow-tree", "--dbh", "0.5", "--height", "1.0", "--periods", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tree Growth"))
        .stdout(predicate::str::contains("0.50"));
}

#[test]
fn test_grow_tree_requires_dbh() {
    cmd().args(["grow-tree"]).assert().failure();
}

#[test]
fn test_grow_tree_rejects_bad_crown_ratio() {
    cmd()
        .args(["grow-tree", "--dbh", "5", "--crown-ratio", "1.5"])
        .assert()
        .failure();
}

// --- Species subcommand ---

#[test]
fn test_species_list() {
    cmd()
        .arg("species")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loblolly pine"));
}

#[test]
fn test_species_export_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("species.toml");

    cmd()
        .args(["species", "--export", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 species"));

    cmd()
        .args(["species", "--coefficients", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("LP"));
}

// --- Height subcommand ---

#[test]
fn test_height_table() {
    cmd()
        .args(["height", "--max-dbh", "10", "--step", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Height-Diameter Curve (LP)"))
        .stdout(predicate::str::contains("9.0"));
}

#[test]
fn test_height_invalid_range() {
    cmd()
        .args(["height", "--min-dbh", "10", "--max-dbh", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid diameter range"));
}

#[test]
fn test_height_step_too_small() {
    cmd()
        .args(["height", "--min-dbh", "1", "--max-dbh", "30", "--step", "1e-12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Diameter step too small"));
}

#[test]
fn test_height_nan_step_rejected() {
    cmd()
        .args(["height", "--step", "NaN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid diameter range"));
}

// --- Help and version ---

#[test]
fn test_no_subcommand() {
    cmd().assert().failure();
}

#[test]
fn test_help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Forest Stand Simulator"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stand-sim"));
}
