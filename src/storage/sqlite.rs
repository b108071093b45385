//! `SQLite` storage implementation.

use crate::error::{BurrowError, Result};
use crate::model::{
    Comment, Dependency, DependencyType, Event, EventType, Issue, IssueType, OrphanPolicy,
    Priority, Status,
};
use crate::storage::counters;
use crate::storage::events::{self, get_events};
use crate::storage::ids::{self, IdContext};
use crate::storage::schema::apply_schema;
use crate::validation::IssueValidator;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default lock wait. Generous on purpose: this store serializes short
/// write bursts from parallel processes and is not latency-critical.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, collecting audit events to be
/// written atomically with the mutation itself.
pub struct MutationContext {
    pub op_name: String,
    pub actor: String,
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event_type: EventType, issue_id: &str, details: Option<String>) {
        self.events.push(Event {
            id: 0, // DB assigns auto-inc ID
            issue_id: issue_id.to_string(),
            event_type,
            actor: self.actor.clone(),
            old_value: None,
            new_value: None,
            comment: details,
            created_at: Utc::now(),
        });
    }

    pub fn record_field_change(
        &mut self,
        event_type: EventType,
        issue_id: &str,
        old_value: Option<String>,
        new_value: Option<String>,
        comment: Option<String>,
    ) {
        self.events.push(Event {
            id: 0,
            issue_id: issue_id.to_string(),
            event_type,
            actor: self.actor.clone(),
            old_value,
            new_value,
            comment,
            created_at: Utc::now(),
        });
    }
}

impl SqliteStorage {
    /// Open a connection with the default busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a connection with an explicit busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let timeout = lock_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        conn.busy_timeout(Duration::from_millis(timeout))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Execute a mutation inside a write-intent transaction.
    ///
    /// The transaction begins `IMMEDIATE` so the write lock is held before
    /// any read that decides the next counter value or probes a candidate
    /// ID; read-then-upgrade would race against other processes. Collected
    /// events are written before commit; any error rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` fails with, or the commit error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            events::insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op, "mutation committed");

        Ok(result)
    }

    /// Create a new issue, minting an ID if the issue doesn't carry one.
    ///
    /// An explicit ID is validated against the configured prefix. Returns
    /// the final ID.
    ///
    /// # Errors
    ///
    /// Returns validation, configuration, collision, or database errors.
    pub fn create_issue(&mut self, issue: &mut Issue, actor: &str) -> Result<String> {
        IssueValidator::validate(issue).map_err(BurrowError::from_validation_errors)?;

        self.mutate("create_issue", actor, |tx, ctx| {
            let id_ctx = IdContext::load(tx)?;
            if issue.id.is_empty() {
                issue.id = ids::generate_issue_id(tx, &id_ctx, issue, &HashSet::new())?;
            } else {
                issue.id = crate::id::normalize_id(&issue.id);
                crate::id::validate_prefix(&issue.id, &id_ctx.prefix)?;
                if Self::id_exists_tx(tx, &issue.id)? {
                    return Err(BurrowError::IdCollision {
                        id: issue.id.clone(),
                    });
                }
            }

            Self::insert_issue_tx(tx, issue)?;
            ctx.record_event(
                EventType::Created,
                &issue.id,
                Some(format!("Created issue: {}", issue.title)),
            );
            Ok(issue.id.clone())
        })
    }

    /// Create an issue as a child of `parent_id`.
    ///
    /// The child's ID is minted from the parent's child counter inside the
    /// same transaction as the insert.
    ///
    /// # Errors
    ///
    /// Returns `ParentNotFound`, `DepthExceeded`, validation, or database
    /// errors.
    pub fn create_child_issue(
        &mut self,
        parent_id: &str,
        issue: &mut Issue,
        actor: &str,
    ) -> Result<String> {
        IssueValidator::validate(issue).map_err(BurrowError::from_validation_errors)?;

        let parent_id = crate::id::normalize_id(parent_id);
        self.mutate("create_child_issue", actor, |tx, ctx| {
            issue.id = ids::next_child_id(tx, &parent_id)?;
            Self::insert_issue_tx(tx, issue)?;
            tx.execute(
                "INSERT INTO dependencies (issue_id, depends_on_id, type, created_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    issue.id,
                    parent_id,
                    DependencyType::ParentChild.as_str(),
                    Utc::now().to_rfc3339(),
                    ctx.actor,
                ],
            )?;
            ctx.record_event(
                EventType::Created,
                &issue.id,
                Some(format!("Created child of {parent_id}: {}", issue.title)),
            );
            Ok(issue.id.clone())
        })
    }

    /// Create a batch of issues atomically.
    ///
    /// All issues are validated before any database work. IDs (explicit
    /// and generated) are resolved by the batch allocator under the given
    /// orphan policy; issues it marks skipped are not inserted. On any
    /// error the transaction rolls back and none of the batch is durable.
    ///
    /// Returns the assigned IDs in input order, with skipped entries
    /// omitted.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or any allocation/database
    /// error.
    pub fn create_issues(
        &mut self,
        issues: &mut [Issue],
        policy: OrphanPolicy,
        actor: &str,
    ) -> Result<Vec<String>> {
        for issue in issues.iter() {
            IssueValidator::validate(issue).map_err(BurrowError::from_validation_errors)?;
        }

        self.mutate("create_issues", actor, |tx, ctx| {
            let id_ctx = IdContext::load(tx)?;
            let skipped = ids::ensure_batch_ids(tx, &id_ctx, issues, policy)?;
            let skipped: HashSet<usize> = skipped.into_iter().collect();

            let mut assigned = Vec::with_capacity(issues.len() - skipped.len());
            for (idx, issue) in issues.iter_mut().enumerate() {
                if skipped.contains(&idx) {
                    continue;
                }
                if Self::id_exists_tx(tx, &issue.id)? {
                    return Err(BurrowError::IdCollision {
                        id: issue.id.clone(),
                    });
                }
                Self::insert_issue_tx(tx, issue)?;
                ctx.record_event(
                    EventType::Created,
                    &issue.id,
                    Some(format!("Created issue: {}", issue.title)),
                );
                assigned.push(issue.id.clone());
            }
            Ok(assigned)
        })
    }

    fn id_exists_tx(tx: &Transaction<'_>, id: &str) -> Result<bool> {
        let exists = tx
            .prepare_cached("SELECT 1 FROM issues WHERE id = ?1")?
            .exists([id])?;
        Ok(exists)
    }

    /// Fetch an issue inside the current write transaction, so the state
    /// that feeds audit events is the state the write lock sees.
    fn get_issue_tx(tx: &Transaction<'_>, id: &str) -> Result<Option<Issue>> {
        let sql = format!("{ISSUE_COLUMNS} FROM issues WHERE id = ?");
        let result = tx.prepare_cached(&sql)?.query_row([id], issue_from_row);

        match result {
            Ok(issue) => Ok(Some(issue)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn insert_issue_tx(tx: &Transaction<'_>, issue: &mut Issue) -> Result<()> {
        issue.content_hash = Some(issue.compute_content_hash());

        tx.execute(
            "INSERT INTO issues (
                id, content_hash, title, description, design, acceptance_criteria, notes,
                status, priority, issue_type, assignee,
                created_at, created_by, updated_at, closed_at, close_reason,
                due_at, defer_until, external_ref
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                issue.id,
                issue.content_hash,
                issue.title,
                issue.description.as_deref().unwrap_or(""),
                issue.design.as_deref().unwrap_or(""),
                issue.acceptance_criteria.as_deref().unwrap_or(""),
                issue.notes.as_deref().unwrap_or(""),
                issue.status.as_str(),
                issue.priority.0,
                issue.issue_type.as_str(),
                issue.assignee,
                issue.created_at.to_rfc3339(),
                issue.created_by.as_deref().unwrap_or(""),
                issue.updated_at.to_rfc3339(),
                issue.closed_at.map(|dt| dt.to_rfc3339()),
                issue.close_reason.as_deref().unwrap_or(""),
                issue.due_at.map(|dt| dt.to_rfc3339()),
                issue.defer_until.map(|dt| dt.to_rfc3339()),
                issue.external_ref,
            ],
        )?;

        for label in &issue.labels {
            tx.execute(
                "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
                rusqlite::params![issue.id, label],
            )?;
        }

        Ok(())
    }

    /// Get an issue by exact ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let sql = format!("{ISSUE_COLUMNS} FROM issues WHERE id = ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let result = stmt.query_row([id], issue_from_row);

        match result {
            Ok(issue) => Ok(Some(issue)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a possibly-partial ID to a full issue ID.
    ///
    /// Exact matches win; otherwise a unique suffix match on the hash part
    /// is accepted (`a3f` resolves `bw-a3f8e9` when unambiguous).
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for zero matches and `AmbiguousId` for more
    /// than one.
    pub fn resolve_id(&self, partial: &str) -> Result<String> {
        let partial = crate::id::normalize_id(partial);
        if self.get_issue(&partial)?.is_some() {
            return Ok(partial);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id FROM issues WHERE id LIKE ?1 ORDER BY id LIMIT 11")?;
        let matches: Vec<String> = stmt
            .query_map([format!("%{partial}%")], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match matches.len() {
            0 => Err(BurrowError::IssueNotFound { id: partial }),
            1 => Ok(matches.into_iter().next().unwrap_or_default()),
            _ => Err(BurrowError::AmbiguousId { partial, matches }),
        }
    }

    /// Update an issue's fields.
    ///
    /// Maintains the `closed_at` invariant: setting status to `closed`
    /// stamps `closed_at`, setting it to anything else clears it.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or a database error.
    #[allow(clippy::too_many_lines)]
    pub fn update_issue(&mut self, id: &str, updates: &IssueUpdate, actor: &str) -> Result<Issue> {
        if updates.is_empty() {
            return self
                .get_issue(id)?
                .ok_or_else(|| BurrowError::IssueNotFound { id: id.to_string() });
        }

        self.mutate("update_issue", actor, |tx, ctx| {
            // Old values for the audit trail come from under the write
            // lock, not a pre-transaction snapshot.
            let mut issue = Self::get_issue_tx(tx, id)?
                .ok_or_else(|| BurrowError::IssueNotFound { id: id.to_string() })?;

            let mut set_clauses: Vec<String> = vec![];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

            let mut add_update = |field: &str, val: Box<dyn rusqlite::ToSql>| {
                set_clauses.push(format!("{field} = ?"));
                params.push(val);
            };

            if let Some(ref title) = updates.title {
                let old_title = issue.title.clone();
                issue.title.clone_from(title);
                add_update("title", Box::new(title.clone()));
                ctx.record_field_change(
                    EventType::Updated,
                    id,
                    Some(old_title),
                    Some(title.clone()),
                    Some("Title changed".to_string()),
                );
            }

            // Empty string rather than NULL for text columns.
            if let Some(ref val) = updates.description {
                issue.description.clone_from(val);
                add_update(
                    "description",
                    Box::new(val.as_deref().unwrap_or("").to_string()),
                );
            }
            if let Some(ref val) = updates.design {
                issue.design.clone_from(val);
                add_update("design", Box::new(val.as_deref().unwrap_or("").to_string()));
            }
            if let Some(ref val) = updates.acceptance_criteria {
                issue.acceptance_criteria.clone_from(val);
                add_update(
                    "acceptance_criteria",
                    Box::new(val.as_deref().unwrap_or("").to_string()),
                );
            }
            if let Some(ref val) = updates.notes {
                issue.notes.clone_from(val);
                add_update("notes", Box::new(val.as_deref().unwrap_or("").to_string()));
            }

            if let Some(status) = updates.status {
                let old_status = issue.status.as_str().to_string();
                issue.status = status;
                add_update("status", Box::new(status.as_str().to_string()));
                ctx.record_field_change(
                    EventType::StatusChanged,
                    id,
                    Some(old_status),
                    Some(status.as_str().to_string()),
                    None,
                );

                // closed_at is set iff status == closed.
                if status == Status::Closed {
                    let closed_at = Utc::now();
                    issue.closed_at = Some(closed_at);
                    add_update("closed_at", Box::new(Some(closed_at.to_rfc3339())));
                } else {
                    issue.closed_at = None;
                    issue.close_reason = None;
                    add_update("closed_at", Box::new(None::<String>));
                    add_update("close_reason", Box::new(String::new()));
                }
            }

            if let Some(priority) = updates.priority {
                let old_priority = issue.priority.0;
                issue.priority = priority;
                add_update("priority", Box::new(priority.0));
                if priority.0 != old_priority {
                    ctx.record_field_change(
                        EventType::Updated,
                        id,
                        Some(old_priority.to_string()),
                        Some(priority.0.to_string()),
                        Some("Priority changed".to_string()),
                    );
                }
            }

            if let Some(issue_type) = updates.issue_type {
                issue.issue_type = issue_type;
                add_update("issue_type", Box::new(issue_type.as_str().to_string()));
            }

            if let Some(ref assignee_opt) = updates.assignee {
                let old_assignee = issue.assignee.clone();
                issue.assignee.clone_from(assignee_opt);
                add_update("assignee", Box::new(assignee_opt.clone()));
                if old_assignee != *assignee_opt {
                    ctx.record_field_change(
                        EventType::Updated,
                        id,
                        old_assignee,
                        assignee_opt.clone(),
                        Some("Assignee changed".to_string()),
                    );
                }
            }

            if let Some(ref val) = updates.close_reason {
                issue.close_reason.clone_from(val);
                add_update(
                    "close_reason",
                    Box::new(val.as_deref().unwrap_or("").to_string()),
                );
            }
            if let Some(ref val) = updates.due_at {
                issue.due_at = *val;
                add_update("due_at", Box::new(val.map(|d| d.to_rfc3339())));
            }
            if let Some(ref val) = updates.defer_until {
                issue.defer_until = *val;
                add_update("defer_until", Box::new(val.map(|d| d.to_rfc3339())));
            }
            if let Some(ref val) = updates.external_ref {
                issue.external_ref.clone_from(val);
                add_update("external_ref", Box::new(val.clone()));
            }

            let now = Utc::now();
            issue.updated_at = now;
            add_update("updated_at", Box::new(now.to_rfc3339()));

            issue.content_hash = Some(issue.compute_content_hash());
            add_update("content_hash", Box::new(issue.content_hash.clone()));

            let sql = format!("UPDATE issues SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(id.to_string()));
            let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, params_refs.as_slice())?;

            Ok(issue)
        })
    }

    /// Close an issue with an optional reason.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or a database error.
    pub fn close_issue(&mut self, id: &str, reason: Option<&str>, actor: &str) -> Result<Issue> {
        self.mutate("close_issue", actor, |tx, ctx| {
            let mut issue = Self::get_issue_tx(tx, id)?
                .ok_or_else(|| BurrowError::IssueNotFound { id: id.to_string() })?;

            let now = Utc::now();
            tx.execute(
                "UPDATE issues SET status = 'closed', closed_at = ?1, close_reason = ?2,
                        updated_at = ?1
                 WHERE id = ?3",
                rusqlite::params![now.to_rfc3339(), reason.unwrap_or(""), id],
            )?;
            ctx.record_event(EventType::Closed, id, reason.map(ToString::to_string));

            issue.status = Status::Closed;
            issue.closed_at = Some(now);
            issue.close_reason = reason.map(ToString::to_string);
            issue.updated_at = now;
            Ok(issue)
        })
    }

    /// Reopen a closed issue, clearing `closed_at` and the close reason.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or a database error.
    pub fn reopen_issue(&mut self, id: &str, actor: &str) -> Result<Issue> {
        self.mutate("reopen_issue", actor, |tx, ctx| {
            let mut issue = Self::get_issue_tx(tx, id)?
                .ok_or_else(|| BurrowError::IssueNotFound { id: id.to_string() })?;

            let now = Utc::now();
            tx.execute(
                "UPDATE issues SET status = 'open', closed_at = NULL, close_reason = '',
                        updated_at = ?1
                 WHERE id = ?2",
                rusqlite::params![now.to_rfc3339(), id],
            )?;
            ctx.record_event(EventType::Reopened, id, None);

            issue.status = Status::Open;
            issue.closed_at = None;
            issue.close_reason = None;
            issue.updated_at = now;
            Ok(issue)
        })
    }

    /// Permanently delete an issue and its dependent rows.
    ///
    /// Labels, comments, and events cascade via foreign keys; dependency
    /// edges in both directions are removed explicitly. The issue's child
    /// counter row is also dropped so a recreated issue starts fresh.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or a database error.
    pub fn delete_issue(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_issue", actor, |tx, _ctx| {
            if !Self::id_exists_tx(tx, id)? {
                return Err(BurrowError::IssueNotFound { id: id.to_string() });
            }
            tx.execute(
                "DELETE FROM dependencies WHERE issue_id = ?1 OR depends_on_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM child_counters WHERE parent_id = ?1", [id])?;
            tx.execute("DELETE FROM issues WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// List issues with optional filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_issues(&self, filters: &ListFilters) -> Result<Vec<Issue>> {
        let mut sql = format!("{ISSUE_COLUMNS} FROM issues WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        Self::push_filters(&mut sql, &mut params, filters);
        Self::push_ordering(&mut sql, filters);

        if let Some(limit) = filters.limit {
            if limit > 0 {
                sql.push_str(" LIMIT ?");
                params.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
        let mut issues = stmt
            .query_map(params_refs.as_slice(), issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if let Some(ref labels) = filters.labels {
            if !labels.is_empty() {
                issues = self.filter_by_labels(issues, labels)?;
            }
        }

        Ok(issues)
    }

    /// Search issues by substring over title, description, and ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn search_issues(&self, query: &str, filters: &ListFilters) -> Result<Vec<Issue>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "{ISSUE_COLUMNS} FROM issues
             WHERE (title LIKE ?1 OR description LIKE ?1 OR id LIKE ?1)"
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        params.push(Box::new(format!("%{trimmed}%")));

        Self::push_filters(&mut sql, &mut params, filters);
        Self::push_ordering(&mut sql, filters);

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
        let issues = stmt
            .query_map(params_refs.as_slice(), issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(issues)
    }

    fn push_filters(sql: &mut String, params: &mut Vec<Box<dyn rusqlite::ToSql>>, filters: &ListFilters) {
        if let Some(ref statuses) = filters.statuses {
            if !statuses.is_empty() {
                let placeholders: Vec<&str> = statuses.iter().map(|_| "?").collect();
                let _ = write!(sql, " AND status IN ({})", placeholders.join(","));
                for s in statuses {
                    params.push(Box::new(s.as_str().to_string()));
                }
            }
        }

        if let Some(ref types) = filters.types {
            if !types.is_empty() {
                let placeholders: Vec<&str> = types.iter().map(|_| "?").collect();
                let _ = write!(sql, " AND issue_type IN ({})", placeholders.join(","));
                for t in types {
                    params.push(Box::new(t.as_str().to_string()));
                }
            }
        }

        if let Some(ref priorities) = filters.priorities {
            if !priorities.is_empty() {
                let placeholders: Vec<&str> = priorities.iter().map(|_| "?").collect();
                let _ = write!(sql, " AND priority IN ({})", placeholders.join(","));
                for p in priorities {
                    params.push(Box::new(p.0));
                }
            }
        }

        if let Some(ref assignee) = filters.assignee {
            sql.push_str(" AND assignee = ?");
            params.push(Box::new(assignee.clone()));
        }

        if filters.unassigned {
            sql.push_str(" AND assignee IS NULL");
        }

        if !filters.include_closed {
            sql.push_str(" AND status != 'closed'");
        }

        if let Some(ref title_contains) = filters.title_contains {
            sql.push_str(" AND title LIKE ?");
            params.push(Box::new(format!("%{title_contains}%")));
        }
    }

    fn push_ordering(sql: &mut String, filters: &ListFilters) {
        let order = if filters.reverse { "DESC" } else { "ASC" };
        match filters.sort.as_deref() {
            Some("created_at" | "created") => {
                let _ = write!(sql, " ORDER BY created_at {order}");
            }
            Some("updated_at" | "updated") => {
                let _ = write!(sql, " ORDER BY updated_at {order}");
            }
            Some("title") => {
                let _ = write!(sql, " ORDER BY title COLLATE NOCASE {order}");
            }
            Some("priority") => {
                let _ = write!(sql, " ORDER BY priority {order}, created_at DESC");
            }
            _ => sql.push_str(" ORDER BY priority ASC, created_at DESC"),
        }
    }

    fn filter_by_labels(&self, issues: Vec<Issue>, labels: &[String]) -> Result<Vec<Issue>> {
        let mut kept = Vec::new();
        for issue in issues {
            let issue_labels: HashSet<String> =
                self.get_labels(&issue.id)?.into_iter().collect();
            if labels.iter().all(|l| issue_labels.contains(l)) {
                kept.push(issue);
            }
        }
        Ok(kept)
    }

    /// Total number of issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_issues(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Issue counts grouped by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_by_status(&self) -> Result<HashMap<String, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM issues GROUP BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (status, count): (String, i64) = row?;
            map.insert(status, count);
        }
        Ok(map)
    }

    // ------------------------------------------------------------------
    // Dependencies
    // ------------------------------------------------------------------

    /// Add a dependency edge `issue_id -> depends_on_id`.
    ///
    /// # Errors
    ///
    /// Returns `SelfDependency`, `DuplicateDependency`, `IssueNotFound`,
    /// or `DependencyCycle` (for blocking edge types).
    pub fn add_dependency(
        &mut self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: &DependencyType,
        actor: &str,
    ) -> Result<()> {
        if issue_id == depends_on_id {
            return Err(BurrowError::SelfDependency {
                id: issue_id.to_string(),
            });
        }
        for id in [issue_id, depends_on_id] {
            self.get_issue(id)?
                .ok_or_else(|| BurrowError::IssueNotFound { id: id.to_string() })?;
        }

        let exists: bool = self
            .conn
            .prepare("SELECT 1 FROM dependencies WHERE issue_id = ?1 AND depends_on_id = ?2")?
            .exists([issue_id, depends_on_id])?;
        if exists {
            return Err(BurrowError::DuplicateDependency {
                from: issue_id.to_string(),
                to: depends_on_id.to_string(),
            });
        }

        if dep_type.is_blocking() {
            self.check_cycle(issue_id, depends_on_id)?;
        }

        self.mutate("add_dependency", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO dependencies (issue_id, depends_on_id, type, created_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    issue_id,
                    depends_on_id,
                    dep_type.as_str(),
                    Utc::now().to_rfc3339(),
                    actor,
                ],
            )?;
            ctx.record_event(
                EventType::DependencyAdded,
                issue_id,
                Some(format!("Added dependency on {depends_on_id} ({dep_type})")),
            );
            Ok(())
        })
    }

    /// Walk blocking edges from `depends_on_id`; reaching `issue_id` means
    /// the new edge would close a cycle.
    fn check_cycle(&self, issue_id: &str, depends_on_id: &str) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = vec![depends_on_id.to_string()];
        let mut path = vec![issue_id.to_string(), depends_on_id.to_string()];

        while let Some(current) = stack.pop() {
            if current == issue_id {
                return Err(BurrowError::DependencyCycle {
                    path: path.join(" -> "),
                });
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            let mut stmt = self.conn.prepare_cached(
                "SELECT depends_on_id FROM dependencies
                 WHERE issue_id = ?1 AND type IN ('blocks', 'parent-child')",
            )?;
            let next: Vec<String> = stmt
                .query_map([&current], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for n in next {
                if !visited.contains(&n) {
                    path.push(n.clone());
                    stack.push(n);
                }
            }
        }
        Ok(())
    }

    /// Remove a dependency edge. Returns `true` if an edge was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn remove_dependency(
        &mut self,
        issue_id: &str,
        depends_on_id: &str,
        actor: &str,
    ) -> Result<bool> {
        self.mutate("remove_dependency", actor, |tx, ctx| {
            let removed = tx.execute(
                "DELETE FROM dependencies WHERE issue_id = ?1 AND depends_on_id = ?2",
                [issue_id, depends_on_id],
            )?;
            if removed > 0 {
                ctx.record_event(
                    EventType::DependencyRemoved,
                    issue_id,
                    Some(format!("Removed dependency on {depends_on_id}")),
                );
            }
            Ok(removed > 0)
        })
    }

    /// All outgoing dependency records for an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_dependencies(&self, issue_id: &str) -> Result<Vec<Dependency>> {
        let mut stmt = self.conn.prepare(
            "SELECT issue_id, depends_on_id, type, created_at, created_by
             FROM dependencies WHERE issue_id = ?1
             ORDER BY depends_on_id",
        )?;
        let deps = stmt
            .query_map([issue_id], dependency_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    // ------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------

    /// Add a label. Returns `false` if the label was already present.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound`, label validation errors, or database
    /// errors.
    pub fn add_label(&mut self, issue_id: &str, label: &str, actor: &str) -> Result<bool> {
        crate::validation::validate_label(label)?;
        self.get_issue(issue_id)?
            .ok_or_else(|| BurrowError::IssueNotFound {
                id: issue_id.to_string(),
            })?;

        self.mutate("add_label", actor, |tx, ctx| {
            let added = tx.execute(
                "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
                [issue_id, label],
            )?;
            if added > 0 {
                ctx.record_event(EventType::LabelAdded, issue_id, Some(label.to_string()));
            }
            Ok(added > 0)
        })
    }

    /// Remove a label. Returns `false` if the label wasn't present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn remove_label(&mut self, issue_id: &str, label: &str, actor: &str) -> Result<bool> {
        self.mutate("remove_label", actor, |tx, ctx| {
            let removed = tx.execute(
                "DELETE FROM labels WHERE issue_id = ?1 AND label = ?2",
                [issue_id, label],
            )?;
            if removed > 0 {
                ctx.record_event(EventType::LabelRemoved, issue_id, Some(label.to_string()));
            }
            Ok(removed > 0)
        })
    }

    /// Labels for an issue, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_labels(&self, issue_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label FROM labels WHERE issue_id = ?1 ORDER BY label")?;
        let labels = stmt
            .query_map([issue_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Add a comment to an issue.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or a database error.
    pub fn add_comment(&mut self, issue_id: &str, author: &str, text: &str) -> Result<Comment> {
        self.get_issue(issue_id)?
            .ok_or_else(|| BurrowError::IssueNotFound {
                id: issue_id.to_string(),
            })?;

        let created_at = Utc::now();
        let comment_id = self.mutate("add_comment", author, |tx, ctx| {
            tx.execute(
                "INSERT INTO comments (issue_id, author, text, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![issue_id, author, text, created_at.to_rfc3339()],
            )?;
            ctx.record_event(EventType::Commented, issue_id, Some(text.to_string()));
            Ok(tx.last_insert_rowid())
        })?;

        Ok(Comment {
            id: comment_id,
            issue_id: issue_id.to_string(),
            author: author.to_string(),
            body: text.to_string(),
            created_at,
        })
    }

    /// Comments for an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_comments(&self, issue_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_id, author, text, created_at
             FROM comments WHERE issue_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let comments = stmt
            .query_map([issue_id], |row| {
                let created_at_str: String = row.get(4)?;
                Ok(Comment {
                    id: row.get(0)?,
                    issue_id: row.get(1)?,
                    author: row.get(2)?,
                    body: row.get(3)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    /// Events for an issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue_events(&self, issue_id: &str, limit: usize) -> Result<Vec<Event>> {
        get_events(&self.conn, issue_id, limit)
    }

    // ------------------------------------------------------------------
    // ID subsystem surface
    // ------------------------------------------------------------------

    /// Mint the next child ID under a parent, without creating an issue.
    ///
    /// # Errors
    ///
    /// Returns `ParentNotFound` or `DepthExceeded`.
    pub fn next_child_id(&mut self, parent_id: &str, actor: &str) -> Result<String> {
        let parent_id = crate::id::normalize_id(parent_id);
        self.mutate("next_child_id", actor, |tx, _ctx| {
            ids::next_child_id(tx, &parent_id)
        })
    }

    /// Recompute every prefix counter from the issues table.
    ///
    /// Idempotent; safe to run after bulk deletes or imports. Counters may
    /// be lowered when issues were deleted.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn resync_counters(&mut self, actor: &str) -> Result<usize> {
        self.mutate("resync_counters", actor, |tx, _ctx| {
            counters::resync_all(tx)
        })
    }

    /// Current counter rows, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn get_counters(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT prefix, last_id FROM issue_counters ORDER BY prefix")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Config
    // ------------------------------------------------------------------

    /// Fetch a config value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// All config key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_all_config(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM config")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Set a config value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Delete a config value. Returns `true` if a value was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_config(&mut self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM config WHERE key = ?", rusqlite::params![key])?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// All issues with relations populated, sorted by ID for
    /// deterministic JSONL output.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_all_issues_for_export(&self) -> Result<Vec<Issue>> {
        let sql = format!("{ISSUE_COLUMNS} FROM issues ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut issues = stmt
            .query_map([], issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for issue in &mut issues {
            issue.labels = self.get_labels(&issue.id)?;
            issue.dependencies = self.get_dependencies(&issue.id)?;
            issue.comments = self.get_comments(&issue.id)?;
        }
        Ok(issues)
    }
}

const ISSUE_COLUMNS: &str = "SELECT id, content_hash, title, description, design, \
     acceptance_criteria, notes, status, priority, issue_type, assignee, \
     created_at, created_by, updated_at, closed_at, close_reason, \
     due_at, defer_until, external_ref";

/// Empty string to None: the database stores '' for NOT NULL DEFAULT ''
/// text columns, but the API contract expects None for unset values.
fn empty_to_none(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

fn issue_from_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        content_hash: row.get::<_, Option<String>>(1)?,
        title: row.get(2)?,
        description: empty_to_none(row.get::<_, Option<String>>(3)?),
        design: empty_to_none(row.get::<_, Option<String>>(4)?),
        acceptance_criteria: empty_to_none(row.get::<_, Option<String>>(5)?),
        notes: empty_to_none(row.get::<_, Option<String>>(6)?),
        status: parse_status(row.get::<_, Option<String>>(7)?.as_deref()),
        priority: Priority(row.get::<_, Option<i32>>(8)?.unwrap_or(2)),
        issue_type: parse_issue_type(row.get::<_, Option<String>>(9)?.as_deref()),
        assignee: row.get::<_, Option<String>>(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        created_by: empty_to_none(row.get::<_, Option<String>>(12)?),
        updated_at: parse_datetime(&row.get::<_, String>(13)?),
        closed_at: row
            .get::<_, Option<String>>(14)?
            .as_deref()
            .map(parse_datetime),
        close_reason: empty_to_none(row.get::<_, Option<String>>(15)?),
        due_at: row
            .get::<_, Option<String>>(16)?
            .as_deref()
            .map(parse_datetime),
        defer_until: row
            .get::<_, Option<String>>(17)?
            .as_deref()
            .map(parse_datetime),
        external_ref: row.get::<_, Option<String>>(18)?,
        labels: vec![],
        dependencies: vec![],
        comments: vec![],
    })
}

fn dependency_from_row(row: &rusqlite::Row) -> rusqlite::Result<Dependency> {
    let type_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    Ok(Dependency {
        issue_id: row.get(0)?,
        depends_on_id: row.get(1)?,
        dep_type: type_str.parse().unwrap_or(DependencyType::Related),
        created_at: parse_datetime(&created_at_str),
        created_by: empty_to_none(row.get::<_, Option<String>>(4)?),
    })
}

fn parse_status(s: Option<&str>) -> Status {
    s.and_then(|s| s.parse().ok()).unwrap_or_default()
}

fn parse_issue_type(s: Option<&str>) -> IssueType {
    s.and_then(|s| s.parse().ok()).unwrap_or_default()
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    Utc::now()
}

/// Fields to update on an issue. A `None` outer value means "leave
/// unchanged"; a `Some(None)` inner value clears the field.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub design: Option<Option<String>>,
    pub acceptance_criteria: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub issue_type: Option<IssueType>,
    pub assignee: Option<Option<String>>,
    pub close_reason: Option<Option<String>>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub defer_until: Option<Option<DateTime<Utc>>>,
    pub external_ref: Option<Option<String>>,
}

impl IssueUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.design.is_none()
            && self.acceptance_criteria.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.issue_type.is_none()
            && self.assignee.is_none()
            && self.close_reason.is_none()
            && self.due_at.is_none()
            && self.defer_until.is_none()
            && self.external_ref.is_none()
    }
}

/// Filter options for listing issues.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub statuses: Option<Vec<Status>>,
    pub types: Option<Vec<IssueType>>,
    pub priorities: Option<Vec<Priority>>,
    pub assignee: Option<String>,
    pub unassigned: bool,
    pub include_closed: bool,
    pub title_contains: Option<String>,
    pub labels: Option<Vec<String>>,
    pub limit: Option<usize>,
    /// Sort field (priority, `created_at`, `updated_at`, title).
    pub sort: Option<String>,
    pub reverse: bool,
}
