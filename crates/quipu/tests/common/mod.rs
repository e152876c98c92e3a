//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Path to the quipu binary built for this test run
pub fn quipu_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_quipu"))
}

/// Run the quipu binary in the specified directory.
///
/// Colours are disabled and the user config directory points into `dir`, so
/// a config file on the host never leaks into a test.
pub fn run_quipu_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(quipu_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute quipu binary")
}

/// Write a script file into `dir` and return its path
pub fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write script");
    path
}

/// Stdout of a finished command as a string
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command as a string
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
