//! Integration tests for the harmonia binary

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_harmonia"))
        .args(args)
        .env_remove("HARMONIA_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("harmonia-{}-{}.toml", name, std::process::id()))
}

#[test]
fn test_quiet_run_prints_model_string() {
    let (stdout, stderr, code) = run_cli(&[
        "--quiet", "--rows", "200", "--iters", "10", "--hms", "4", "--seed", "1", "--data-seed",
        "2",
    ]);
    if code != 0 {
        eprintln!("STDOUT: {}", stdout);
        eprintln!("STDERR: {}", stderr);
    }
    assert_eq!(code, 0, "Run should succeed");
    let line = stdout.trim();
    assert!(line.starts_with("[Cloudy"), "Unexpected output: {}", line);
    assert!(line.contains("[WetGrass"));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let args = [
        "--quiet", "--rows", "150", "--iters", "8", "--hms", "3", "--seed", "5", "--data-seed",
        "6",
    ];
    let (first, _, code1) = run_cli(&args);
    let (second, _, code2) = run_cli(&args);
    assert_eq!(code1, 0);
    assert_eq!(code2, 0);
    assert_eq!(first, second);
}

#[test]
fn test_full_report() {
    let (stdout, _stderr, code) = run_cli(&[
        "--no-color", "--rows", "100", "--iters", "5", "--hms", "3", "--seed", "2", "--data-seed",
        "3",
    ]);
    assert_eq!(code, 0, "Run should succeed");
    assert!(stdout.contains("Ground truth"));
    assert!(stdout.contains("Learned network"));
    assert!(stdout.contains("Structural distance to truth"));
    assert!(stdout.contains("5 iterations"));
}

#[test]
fn test_config_show() {
    let (stdout, _stderr, code) = run_cli(&["--hms", "9", "config", "show"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[search]"));
    assert!(stdout.contains("hms = 9"));
    assert!(stdout.contains("Sprinkler"));
}

#[test]
fn test_config_init_and_use() {
    let path = temp_path("init");
    let _ = fs::remove_file(&path);
    let path_str = path.to_str().unwrap();

    let (_stdout, _stderr, code) = run_cli(&["--config", path_str, "config", "init"]);
    assert_eq!(code, 0, "Init should succeed");
    assert!(path.exists());

    // A second init refuses to overwrite.
    let (_stdout, stderr, code) = run_cli(&["--config", path_str, "config", "init"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already exists"));

    let (stdout, _stderr, code) = run_cli(&[
        "--config", path_str, "--quiet", "--rows", "50", "--iters", "3", "--hms", "2", "--seed",
        "1", "--data-seed", "1",
    ]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("[Cloudy"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_invalid_config_file() {
    let path = temp_path("invalid");
    fs::write(&path, "[search]\nhms = 0\n").unwrap();
    let (_stdout, stderr, code) = run_cli(&["--config", path.to_str().unwrap(), "--quiet"]);
    fs::remove_file(&path).unwrap();

    assert_eq!(code, 1);
    assert!(stderr.contains("hms"), "Unexpected error: {}", stderr);
}

#[test]
fn test_missing_config_file() {
    let (_stdout, stderr, code) = run_cli(&["--config", "/nonexistent/harmonia.toml"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Failed to read config file"));
}
