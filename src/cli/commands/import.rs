//! Import command: bulk-load issues from a JSONL file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::str::FromStr;

use tracing::info;

use crate::cli::ImportArgs;
use crate::config::{self, CliOverrides};
use crate::error::{BurrowError, Result};
use crate::model::{Issue, OrphanPolicy};

/// Execute the import command.
///
/// The whole file is imported in one transaction; any error rolls back
/// every line.
///
/// # Errors
///
/// Returns `JsonlParse` for malformed lines, orphan-policy violations, or
/// any storage failure.
pub fn execute(args: &ImportArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;

    let policy = match &args.orphans {
        Some(value) => OrphanPolicy::from_str(value)?,
        None => storage
            .get_config("orphan_handling")?
            .map(|v| OrphanPolicy::from_str(&v))
            .transpose()?
            .unwrap_or_default(),
    };

    let mut issues = read_jsonl(&args.file)?;

    if issues.is_empty() {
        println!("Nothing to import.");
        return Ok(());
    }

    if args.dry_run {
        println!("Would import {} issue(s).", issues.len());
        return Ok(());
    }

    let actor = config::resolve_actor(cli);
    let ids = storage.create_issues(&mut issues, policy, &actor)?;

    info!(count = ids.len(), policy = policy.as_str(), "imported issues");

    if json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
    } else {
        println!("Imported {} issue(s).", ids.len());
        let skipped = issues.len() - ids.len();
        if skipped > 0 {
            println!("Skipped {skipped} orphaned issue(s).");
        }
    }
    Ok(())
}

fn read_jsonl(path: &std::path::Path) -> Result<Vec<Issue>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut issues = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let issue: Issue =
            serde_json::from_str(trimmed).map_err(|e| BurrowError::JsonlParse {
                line: index + 1,
                reason: e.to_string(),
            })?;
        issues.push(issue);
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_lines_and_skips_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "One"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"title": "Two", "priority": 1}}"#).unwrap();

        let issues = read_jsonl(file.path()).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].priority.0, 1);
    }

    #[test]
    fn reports_line_number_on_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "Ok"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = read_jsonl(file.path()).unwrap_err();
        assert!(matches!(err, BurrowError::JsonlParse { line: 2, .. }));
    }
}
