//! List command: primary discovery interface.

use std::str::FromStr;

use crate::cli::ListArgs;
use crate::cli::commands::format_issue_line;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::model::{IssueType, Priority, Status};
use crate::storage::ListFilters;

/// Execute the list command.
///
/// # Errors
///
/// Returns an error for invalid filter values or a storage failure.
pub fn execute(args: &ListArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let storage = config::open_storage(cli)?;
    let filters = build_filters(args)?;
    let issues = storage.list_issues(&filters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else if issues.is_empty() {
        println!("No issues found.");
    } else {
        for issue in &issues {
            println!("{}", format_issue_line(issue));
        }
        println!("\n{} issue(s)", issues.len());
    }
    Ok(())
}

fn build_filters(args: &ListArgs) -> Result<ListFilters> {
    let statuses = parse_all::<Status>(&args.status)?;
    let types = parse_all::<IssueType>(&args.issue_type)?;
    let priorities = parse_all::<Priority>(&args.priority)?;

    // An explicit status filter implies the caller wants those statuses,
    // closed included.
    let include_closed = args.all || statuses.is_some();

    Ok(ListFilters {
        statuses,
        types,
        priorities,
        assignee: args.assignee.clone(),
        unassigned: args.unassigned,
        include_closed,
        labels: (!args.label.is_empty()).then(|| args.label.clone()),
        limit: args.limit,
        sort: args.sort.clone(),
        reverse: args.reverse,
        ..Default::default()
    })
}

fn parse_all<T: FromStr>(values: &[String]) -> Result<Option<Vec<T>>>
where
    crate::error::BurrowError: From<T::Err>,
{
    if values.is_empty() {
        return Ok(None);
    }
    let parsed = values
        .iter()
        .map(|v| T::from_str(v).map_err(Into::into))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(parsed))
}
