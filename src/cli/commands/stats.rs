//! Stats command: issue counts by status.

use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
pub fn execute(json: bool, cli: &CliOverrides) -> Result<()> {
    let storage = config::open_storage(cli)?;
    let total = storage.count_issues()?;
    let by_status = storage.count_by_status()?;

    if json {
        let out = serde_json::json!({
            "total": total,
            "by_status": by_status,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Total issues: {total}");
        let mut statuses: Vec<_> = by_status.iter().collect();
        statuses.sort_by(|a, b| a.0.cmp(b.0));
        for (status, count) in statuses {
            println!("  {status}: {count}");
        }
    }
    Ok(())
}
