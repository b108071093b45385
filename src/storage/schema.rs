//! Database schema definitions and migration logic.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// The complete SQL schema for the burrow database.
pub const SCHEMA_SQL: &str = r"
    -- Issues
    CREATE TABLE IF NOT EXISTS issues (
        id TEXT PRIMARY KEY,
        content_hash TEXT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        design TEXT NOT NULL DEFAULT '',
        acceptance_criteria TEXT NOT NULL DEFAULT '',
        notes TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        priority INTEGER NOT NULL,
        issue_type TEXT NOT NULL,
        assignee TEXT,
        created_at TEXT NOT NULL,
        created_by TEXT NOT NULL DEFAULT '',
        updated_at TEXT NOT NULL,
        closed_at TEXT,
        close_reason TEXT NOT NULL DEFAULT '',
        due_at TEXT,
        defer_until TEXT,
        external_ref TEXT,
        CHECK (length(title) >= 1 AND length(title) <= 500),
        CHECK (priority >= 0 AND priority <= 4)
    );

    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
    CREATE INDEX IF NOT EXISTS idx_issues_priority ON issues(priority);
    CREATE INDEX IF NOT EXISTS idx_issues_issue_type ON issues(issue_type);
    CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee);
    CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues(created_at);

    -- Dependencies
    CREATE TABLE IF NOT EXISTS dependencies (
        issue_id TEXT NOT NULL,
        depends_on_id TEXT NOT NULL,
        type TEXT NOT NULL,
        created_at TEXT NOT NULL,
        created_by TEXT,
        PRIMARY KEY (issue_id, depends_on_id)
    );
    CREATE INDEX IF NOT EXISTS idx_dependencies_issue_id ON dependencies(issue_id);
    CREATE INDEX IF NOT EXISTS idx_dependencies_depends_on_id ON dependencies(depends_on_id);

    -- Labels
    CREATE TABLE IF NOT EXISTS labels (
        issue_id TEXT NOT NULL,
        label TEXT NOT NULL,
        PRIMARY KEY (issue_id, label),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_labels_label ON labels(label);

    -- Comments
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id TEXT NOT NULL,
        author TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_comments_issue_id ON comments(issue_id);

    -- Events (audit trail)
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        issue_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        actor TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT,
        comment TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_events_issue_id ON events(issue_id);
    CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at);

    -- Config (runtime key/value)
    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Internal bookkeeping, not exposed through 'bur config'
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Per-prefix flat ID counters
    CREATE TABLE IF NOT EXISTS issue_counters (
        prefix TEXT PRIMARY KEY,
        last_id INTEGER NOT NULL DEFAULT 0
    );

    -- Per-parent child ordinal counters
    CREATE TABLE IF NOT EXISTS child_counters (
        parent_id TEXT PRIMARY KEY,
        last_child INTEGER NOT NULL DEFAULT 0
    );
";

/// Apply the schema to the database.
///
/// Idempotent: all statements use `IF NOT EXISTS`, and migrations check
/// before altering.
///
/// # Errors
///
/// Returns an error if SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    run_migrations(conn)?;

    conn.execute(
        "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    // WAL for multi-process concurrency.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}

/// Migrations for databases created before the counter tables existed.
///
/// Older schema versions stored `next_child_number` (the next unused
/// ordinal) instead of `last_child` (the high-water mark); rebuild the
/// table when the old column is present.
fn run_migrations(conn: &Connection) -> Result<()> {
    let has_legacy_child_column: bool = conn
        .prepare("SELECT 1 FROM pragma_table_info('child_counters') WHERE name='next_child_number'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if has_legacy_child_column {
        conn.execute_batch(
            "BEGIN;
             CREATE TABLE child_counters_new (
                 parent_id TEXT PRIMARY KEY,
                 last_child INTEGER NOT NULL DEFAULT 0
             );
             INSERT INTO child_counters_new (parent_id, last_child)
                 SELECT parent_id, next_child_number - 1 FROM child_counters;
             DROP TABLE child_counters;
             ALTER TABLE child_counters_new RENAME TO child_counters;
             COMMIT;",
        )?;
    }

    Ok(())
}
