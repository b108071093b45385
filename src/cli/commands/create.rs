//! Create command implementation.

use std::str::FromStr;

use crate::cli::CreateArgs;
use crate::cli::commands::parse_optional_date;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::model::{Issue, IssueType, Priority};

/// Execute the create command.
///
/// # Errors
///
/// Returns an error for invalid field values, a missing parent, or any
/// storage failure. Nothing is persisted on error.
pub fn execute(args: &CreateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    let mut issue = Issue::new(args.title.clone());
    issue.description = args.description.clone();
    issue.assignee = args.assignee.clone();
    issue.created_by = Some(actor.clone());
    issue.external_ref = args.external_ref.clone();
    issue.due_at = parse_optional_date(args.due.as_deref(), "due")?;
    issue.defer_until = parse_optional_date(args.defer.as_deref(), "defer")?;
    if let Some(ref p) = args.priority {
        issue.priority = Priority::from_str(p)?;
    }
    if let Some(ref t) = args.issue_type {
        issue.issue_type = IssueType::from_str(t)?;
    }
    if let Some(ref explicit) = args.id {
        issue.id = explicit.clone();
    }

    let id = if let Some(ref parent) = args.parent {
        let parent_id = storage.resolve_id(parent)?;
        storage.create_child_issue(&parent_id, &mut issue, &actor)?
    } else {
        storage.create_issue(&mut issue, &actor)?
    };

    for label in &args.label {
        storage.add_label(&id, label, &actor)?;
    }

    if json {
        let created = storage.get_issue(&id)?.unwrap_or(issue);
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("Created {id}");
    }
    Ok(())
}
