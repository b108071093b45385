//! Command implementations.
//!
//! Each module exposes `execute(...) -> Result<()>` taking its parsed
//! arguments, the global `--json` flag where output matters, and the
//! global CLI overrides.

pub mod close;
pub mod comment;
pub mod config;
pub mod counters;
pub mod create;
pub mod delete;
pub mod dep;
pub mod export;
pub mod import;
pub mod init;
pub mod label;
pub mod list;
pub mod q;
pub mod reopen;
pub mod search;
pub mod show;
pub mod stats;
pub mod update;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::Issue;
use crate::util::time::parse_flexible_timestamp;

/// Parse an optional flexible date argument.
pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field_name: &str,
) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|v| parse_flexible_timestamp(v, field_name))
        .transpose()
}

/// One-line issue summary for list output.
pub(crate) fn format_issue_line(issue: &Issue) -> String {
    let assignee = issue
        .assignee
        .as_deref()
        .map(|a| format!(" @{a}"))
        .unwrap_or_default();
    format!(
        "{:<14} {} [{}] {}{}",
        issue.id, issue.priority, issue.status, issue.title, assignee
    )
}

/// Multi-line issue detail block for show output.
pub(crate) fn format_issue_details(issue: &Issue) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}: {}\n", issue.id, issue.title));
    out.push_str(&format!(
        "  status: {}  priority: {}  type: {}\n",
        issue.status, issue.priority, issue.issue_type
    ));
    if let Some(ref assignee) = issue.assignee {
        out.push_str(&format!("  assignee: {assignee}\n"));
    }
    out.push_str(&format!(
        "  created: {}",
        issue.created_at.format("%Y-%m-%d %H:%M")
    ));
    if let Some(ref by) = issue.created_by {
        out.push_str(&format!(" by {by}"));
    }
    out.push('\n');
    if let Some(closed) = issue.closed_at {
        out.push_str(&format!("  closed: {}", closed.format("%Y-%m-%d %H:%M")));
        if let Some(ref reason) = issue.close_reason {
            out.push_str(&format!(" ({reason})"));
        }
        out.push('\n');
    }
    if let Some(due) = issue.due_at {
        out.push_str(&format!("  due: {}\n", due.format("%Y-%m-%d %H:%M")));
    }
    if let Some(defer) = issue.defer_until {
        out.push_str(&format!("  deferred until: {}\n", defer.format("%Y-%m-%d %H:%M")));
    }
    if let Some(ref external_ref) = issue.external_ref {
        out.push_str(&format!("  ref: {external_ref}\n"));
    }
    if !issue.labels.is_empty() {
        out.push_str(&format!("  labels: {}\n", issue.labels.join(", ")));
    }
    if let Some(ref description) = issue.description {
        out.push_str(&format!("\n{description}\n"));
    }
    if let Some(ref notes) = issue.notes {
        out.push_str(&format!("\nnotes: {notes}\n"));
    }
    if !issue.dependencies.is_empty() {
        out.push_str("\ndependencies:\n");
        for dep in &issue.dependencies {
            out.push_str(&format!("  {} -> {}\n", dep.dep_type, dep.depends_on_id));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_line_includes_id_and_title() {
        let mut issue = Issue::new("Fix the widget");
        issue.id = "bw-a3f8e9".to_string();
        let line = format_issue_line(&issue);
        assert!(line.contains("bw-a3f8e9"));
        assert!(line.contains("Fix the widget"));
        assert!(line.contains("[open]"));
    }

    #[test]
    fn details_include_labels_and_reason() {
        let mut issue = Issue::new("Done thing");
        issue.id = "bw-1".to_string();
        issue.labels = vec!["backend".to_string()];
        issue.close_reason = Some("fixed".to_string());
        issue.closed_at = Some(Utc::now());
        let details = format_issue_details(&issue);
        assert!(details.contains("labels: backend"));
        assert!(details.contains("(fixed)"));
    }
}
