use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn stress() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sos-stress"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_clean_run_destroys_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("objects");

    stress()
        .arg("--root")
        .arg(&root)
        .args(["--keys", "4", "--writers", "2", "--readers", "2", "--deleters", "1"])
        .args(["--iterations", "50", "--value-size", "256"])
        .env("SOS__STORE__SYNC", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stress run finished"));

    assert!(!root.exists());
}

#[test]
fn test_keep_leaves_objects_and_no_scratch() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("objects");

    stress()
        .arg("--root")
        .arg(&root)
        .args(["--iterations", "20", "--keep"])
        .env("SOS__STORE__SYNC", "false")
        .assert()
        .success();

    assert!(root.is_dir());
    assert_eq!(fs::read_dir(root.join(".tmp")).unwrap().count(), 0);
}

#[test]
fn test_root_from_config_file() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("configured");
    let config = temp.path().join("stress.toml");
    fs::write(&config, format!("[store]\nroot = {:?}\nsync = false\n", root.display().to_string()))
        .unwrap();

    stress()
        .arg("--config")
        .arg(&config)
        .args(["--iterations", "10", "--keep"])
        .assert()
        .success();

    assert!(root.join(".tmp").is_dir());
}

#[test]
fn test_missing_root_fails() {
    stress()
        .args(["--iterations", "1"])
        .env_remove("SOS__STORE__ROOT")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid store configuration"));
}

#[test]
fn test_unknown_config_key_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("stress.toml");
    fs::write(&config, "[store]\nroot = \"/tmp/x\"\ncompression = \"lz4\"\n").unwrap();

    stress().arg("--config").arg(&config).assert().failure();
}
