//! Audit event writes and reads.
//!
//! Events are appended inside the same transaction as the mutation they
//! record, so the audit trail can never disagree with committed state.
//! They live in the local database only and are never exported.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};

use crate::error::Result;
use crate::model::{Event, EventType};

/// Insert an event within the caller's transaction.
///
/// The event's `created_at` is stored as-is; the database assigns the
/// rowid, which is returned.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(tx: &Transaction<'_>, event: &Event) -> Result<i64> {
    tx.execute(
        "INSERT INTO events (issue_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.issue_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at.to_rfc3339(),
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Get events for an issue, newest first. `limit` of 0 means no limit.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(conn: &Connection, issue_id: &str, limit: usize) -> Result<Vec<Event>> {
    let query = "SELECT id, issue_id, event_type, actor, old_value, new_value, comment, created_at
                 FROM events
                 WHERE issue_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2";
    let effective_limit = if limit == 0 { -1_i64 } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    };

    let mut stmt = conn.prepare(query)?;
    let events = stmt
        .query_map(params![issue_id, effective_limit], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(events)
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get(2)?;
    let created_at_str: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

    Ok(Event {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        event_type: parse_event_type(&event_type_str),
        actor: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        comment: row.get(6)?,
        created_at,
    })
}

fn parse_event_type(s: &str) -> EventType {
    match s {
        "created" => EventType::Created,
        "updated" => EventType::Updated,
        "status_changed" => EventType::StatusChanged,
        "commented" => EventType::Commented,
        "closed" => EventType::Closed,
        "reopened" => EventType::Reopened,
        "dependency_added" => EventType::DependencyAdded,
        "dependency_removed" => EventType::DependencyRemoved,
        "label_added" => EventType::LabelAdded,
        "label_removed" => EventType::LabelRemoved,
        "deleted" => EventType::Deleted,
        other => EventType::Custom(other.to_string()),
    }
}
