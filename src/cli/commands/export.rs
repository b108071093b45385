//! Export command: dump all issues as JSONL.

use std::io::Write;
use std::path::Path;

use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute the export command.
///
/// Issues are written one JSON object per line, ordered by ID, with
/// labels, dependencies, and comments inlined.
///
/// # Errors
///
/// Returns an error for storage or I/O failures.
pub fn execute(out: Option<&Path>, cli: &CliOverrides) -> Result<()> {
    let storage = config::open_storage(cli)?;
    let issues = storage.get_all_issues_for_export()?;

    let mut buffer = String::new();
    for issue in &issues {
        buffer.push_str(&serde_json::to_string(issue)?);
        buffer.push('\n');
    }

    match out {
        Some(path) => {
            std::fs::write(path, buffer)?;
            eprintln!("Exported {} issue(s) to {}", issues.len(), path.display());
        }
        None => {
            std::io::stdout().write_all(buffer.as_bytes())?;
        }
    }
    Ok(())
}
