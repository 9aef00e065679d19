//! Binary smoke tests: spawn the `scout` binary against a temporary
//! database. No network access is required by any test here.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn scout_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("scout");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/scout.sqlite"

[ranking]
limit = 10
contributor_top_k = 3

[server]
bind = "127.0.0.1:8781"
"#,
        root.display()
    );

    let config_path = config_dir.join("scout.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_scout(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = scout_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run scout binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_scout(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_scout(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_scout(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("scout.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"scout.db\"\n\n[ranking]\nlimit = 0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_scout(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("ranking.limit"));
}

#[test]
fn test_show_unknown_repository_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_scout(&config_path, &["init"]);

    let (_, stderr, success) = run_scout(&config_path, &["show", "nobody/nothing"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_rank_rejects_bare_target_before_any_network_call() {
    let (_tmp, config_path) = setup_test_env();
    run_scout(&config_path, &["init"]);

    let (_, stderr, success) = run_scout(&config_path, &["rank", "not-a-full-name"]);
    assert!(!success);
    assert!(stderr.contains("owner/name"));
}

#[test]
fn test_embed_pending_requires_provider() {
    let (_tmp, config_path) = setup_test_env();
    run_scout(&config_path, &["init"]);

    let (_, stderr, success) = run_scout(&config_path, &["embed", "pending"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}
