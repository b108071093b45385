//! Update command implementation.

use std::str::FromStr;

use crate::cli::UpdateArgs;
use crate::cli::commands::format_issue_details;
use crate::config::{self, CliOverrides};
use crate::error::{BurrowError, Result};
use crate::model::{IssueType, Priority, Status};
use crate::storage::IssueUpdate;
use crate::util::time::parse_flexible_timestamp;

/// Execute the update command.
///
/// # Errors
///
/// Returns an error for invalid values, an unresolvable ID, or when no
/// fields were given.
pub fn execute(args: &UpdateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    let updates = build_update(args)?;
    if updates.is_empty() {
        return Err(BurrowError::validation("update", "no fields to update"));
    }

    let id = storage.resolve_id(&args.id)?;
    let issue = storage.update_issue(&id, &updates, &actor)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        println!("Updated {id}");
        print!("{}", format_issue_details(&issue));
    }
    Ok(())
}

/// Map string arguments onto typed update fields. An empty string on a
/// clearable field clears it.
fn build_update(args: &UpdateArgs) -> Result<IssueUpdate> {
    let mut updates = IssueUpdate {
        title: args.title.clone(),
        ..Default::default()
    };

    if let Some(ref s) = args.status {
        updates.status = Some(Status::from_str(s)?);
    }
    if let Some(ref p) = args.priority {
        updates.priority = Some(Priority::from_str(p)?);
    }
    if let Some(ref t) = args.issue_type {
        updates.issue_type = Some(IssueType::from_str(t)?);
    }
    updates.description = args.description.as_deref().map(clearable);
    updates.notes = args.notes.as_deref().map(clearable);
    updates.assignee = args.assignee.as_deref().map(clearable);
    updates.external_ref = args.external_ref.as_deref().map(clearable);
    updates.due_at = parse_clearable_date(args.due.as_deref(), "due")?;
    updates.defer_until = parse_clearable_date(args.defer.as_deref(), "defer")?;

    Ok(updates)
}

fn clearable(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_clearable_date(
    value: Option<&str>,
    field_name: &str,
) -> Result<Option<Option<chrono::DateTime<chrono::Utc>>>> {
    match value {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(v) => Ok(Some(Some(parse_flexible_timestamp(v, field_name)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> UpdateArgs {
        UpdateArgs {
            id: "bw-1".to_string(),
            title: None,
            description: None,
            status: None,
            priority: None,
            issue_type: None,
            assignee: None,
            notes: None,
            due: None,
            defer: None,
            external_ref: None,
        }
    }

    #[test]
    fn empty_args_build_empty_update() {
        assert!(build_update(&args()).unwrap().is_empty());
    }

    #[test]
    fn empty_string_clears_assignee() {
        let mut a = args();
        a.assignee = Some(String::new());
        let updates = build_update(&a).unwrap();
        assert_eq!(updates.assignee, Some(None));
    }

    #[test]
    fn empty_due_clears_date() {
        let mut a = args();
        a.due = Some(String::new());
        let updates = build_update(&a).unwrap();
        assert_eq!(updates.due_at, Some(None));
    }

    #[test]
    fn status_parses() {
        let mut a = args();
        a.status = Some("in_progress".to_string());
        let updates = build_update(&a).unwrap();
        assert_eq!(updates.status, Some(Status::InProgress));
    }
}
