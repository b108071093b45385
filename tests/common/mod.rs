//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Output;

use assert_cmd::Command;
use tempfile::TempDir;

/// An isolated workspace directory for CLI runs.
pub struct BurWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl BurWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(".burrow/burrow.db")
    }
}

/// Run `bur` inside the workspace and capture its output.
pub fn run_bur<I, S>(workspace: &BurWorkspace, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::cargo_bin("bur").expect("bur binary");
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    cmd.env("BURROW_ACTOR", "tester");
    cmd.env_remove("BURROW_DIR");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("run bur")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Extract the minted ID from `Created <id>` output.
pub fn created_id(output: &Output) -> String {
    let stdout = stdout_of(output);
    stdout
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("Created "))
        .unwrap_or("")
        .trim()
        .to_string()
}
