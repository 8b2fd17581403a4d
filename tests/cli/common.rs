//! Common utilities for binary tests.

use std::path::Path;
use std::process::Command;

/// Environment variables that would leak a developer's setup into tests.
const ISOLATED_VARS: &[&str] = &[
    "BI_BASE_URL",
    "BI_DATABASE_ID",
    "BI_USERNAME",
    "BI_PASSWORD",
    "BIDASH_CONFIG",
];

/// Runs bidash with the given arguments and config file.
/// Returns (exit code, stdout, stderr).
pub fn run_bidash(args: &[&str], config: &Path) -> (i32, String, String) {
    let mut command = Command::new(env!("CARGO_BIN_EXE_bidash"));
    for var in ISOLATED_VARS {
        command.env_remove(var);
    }
    let output = command
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "info")
        .current_dir(config.parent().unwrap_or(Path::new(".")))
        .output()
        .expect("Failed to execute bidash");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
