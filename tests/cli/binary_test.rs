//! Exit codes and error reporting of the binary.

use std::fs;

use super::common::run_bidash;

#[test]
fn test_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_bidash(&["--help"], &dir.path().join("config.toml"));

    assert_eq!(code, 0);
    for name in ["query", "report", "trend", "regions", "dashboard", "login"] {
        assert!(stdout.contains(name), "help is missing {name}: {stdout}");
    }
}

#[test]
fn test_missing_base_url_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[api]\nusername = \"analyst\"\npassword = \"secret\"\n").unwrap();

    let (code, stdout, stderr) = run_bidash(&["report", "--week-start", "2024-01-01"], &config);

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Configuration Error"), "stderr: {stderr}");
    assert!(stderr.contains("base URL"), "stderr: {stderr}");
}

#[test]
fn test_bad_date_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_bidash(
        &["report", "--week-start", "01/01/2024"],
        &dir.path().join("config.toml"),
    );

    assert_eq!(code, 2);
    assert!(stderr.contains("--week-start"));
}

#[test]
fn test_forget_without_username_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_bidash(&["login", "--forget"], &dir.path().join("config.toml"));

    assert_eq!(code, 1);
    assert!(stderr.contains("username"), "stderr: {stderr}");
}
