//! Search command: substring search over title, description, and ID.

use crate::cli::SearchArgs;
use crate::cli::commands::format_issue_line;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::storage::ListFilters;

/// Execute the search command.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the query fails.
pub fn execute(args: &SearchArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let storage = config::open_storage(cli)?;
    let filters = ListFilters {
        include_closed: args.all,
        limit: args.limit,
        ..Default::default()
    };
    let issues = storage.search_issues(&args.query, &filters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else if issues.is_empty() {
        println!("No matches for '{}'.", args.query);
    } else {
        for issue in &issues {
            println!("{}", format_issue_line(issue));
        }
        println!("\n{} match(es)", issues.len());
    }
    Ok(())
}
