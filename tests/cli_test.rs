//! Command-line behaviour that does not need a real model.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_config_path_prints_given_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    cargo_bin_cmd!("birdlens")
        .args(["config", "path", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.toml");

    cargo_bin_cmd!("birdlens")
        .args(["config", "init", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(config.is_file());

    cargo_bin_cmd!("birdlens")
        .args(["config", "init", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    cargo_bin_cmd!("birdlens")
        .args(["config", "show", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("[detection]"))
        .stdout(predicate::str::contains("threshold = 0.25"));
}

#[test]
fn test_classify_missing_image_fails_before_loading_models() {
    let dir = TempDir::new().unwrap();

    cargo_bin_cmd!("birdlens")
        .args(["classify", "--config"])
        .arg(dir.path().join("config.toml"))
        .arg(dir.path().join("missing.jpg"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("image source not found"));
}

#[test]
fn test_detect_rejects_out_of_range_threshold() {
    let dir = TempDir::new().unwrap();

    cargo_bin_cmd!("birdlens")
        .args(["detect", "bird.jpg", "--threshold", "1.5", "--config"])
        .arg(dir.path().join("config.toml"))
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[detection]\nthreshold = 2.0\n").unwrap();

    cargo_bin_cmd!("birdlens")
        .args(["providers", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration validation failed"));
}

#[test]
fn test_remote_uri_is_rejected() {
    let dir = TempDir::new().unwrap();

    cargo_bin_cmd!("birdlens")
        .args(["detect", "https://example.com/bird.jpg", "--config"])
        .arg(dir.path().join("config.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported image URI"));
}
