//! Show command: full details for one or more issues.

use crate::cli::commands::format_issue_details;
use crate::config::{self, CliOverrides};
use crate::error::{BurrowError, Result};

/// Execute the show command.
///
/// # Errors
///
/// Returns `IssueNotFound` or `AmbiguousId` when an argument does not
/// resolve to exactly one issue.
pub fn execute(ids: &[String], json: bool, cli: &CliOverrides) -> Result<()> {
    if ids.is_empty() {
        return Err(BurrowError::validation("id", "at least one issue ID is required"));
    }

    let storage = config::open_storage(cli)?;
    let mut issues = Vec::with_capacity(ids.len());
    for partial in ids {
        let id = storage.resolve_id(partial)?;
        let mut issue = storage
            .get_issue(&id)?
            .ok_or_else(|| BurrowError::IssueNotFound { id: id.clone() })?;
        issue.labels = storage.get_labels(&id)?;
        issue.dependencies = storage.get_dependencies(&id)?;
        issue.comments = storage.get_comments(&id)?;
        issues.push(issue);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        for (i, issue) in issues.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print!("{}", format_issue_details(issue));
            if !issue.comments.is_empty() {
                println!("\ncomments:");
                for comment in &issue.comments {
                    println!(
                        "  [{}] {}: {}",
                        comment.created_at.format("%Y-%m-%d %H:%M"),
                        comment.author,
                        comment.body
                    );
                }
            }
        }
    }
    Ok(())
}
