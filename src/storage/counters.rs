//! Atomic per-prefix and per-parent counters.
//!
//! All functions here take an open transaction and never commit; callers
//! own transaction scope. Each counter advance is a single
//! `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement so that two
//! writers racing on the same row serialize inside SQLite rather than in
//! application code.

use rusqlite::Transaction;

use crate::error::Result;

/// Seeded flat-counter upsert.
///
/// On first use for a prefix the counter seeds from the highest numeric
/// suffix already present in the issues table, so imported or manually
/// inserted IDs are never re-minted. The corpus max is recomputed on every
/// conflict too: `MAX(last_id, corpus_max)` keeps the counter monotonic
/// even if rows were inserted behind its back.
const NEXT_ID_SQL: &str = "
    INSERT INTO issue_counters (prefix, last_id)
    SELECT ?1, COALESCE(MAX(CAST(substr(id, length(?1) + 2) AS INTEGER)), 0) + ?2
    FROM issues
    WHERE id LIKE ?1 || '-%'
      AND substr(id, length(?1) + 2) GLOB '[0-9]*'
      AND substr(id, length(?1) + 2) NOT GLOB '*[^0-9]*'
    ON CONFLICT(prefix) DO UPDATE SET last_id = MAX(
        last_id,
        (SELECT COALESCE(MAX(CAST(substr(id, length(?1) + 2) AS INTEGER)), 0)
         FROM issues
         WHERE id LIKE ?1 || '-%'
           AND substr(id, length(?1) + 2) GLOB '[0-9]*'
           AND substr(id, length(?1) + 2) NOT GLOB '*[^0-9]*')
    ) + ?2
    RETURNING last_id
";

/// Advance the flat counter for `prefix` by one and return the new value.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn next_value(tx: &Transaction<'_>, prefix: &str) -> Result<i64> {
    let value = tx.query_row(NEXT_ID_SQL, rusqlite::params![prefix, 1_i64], |row| {
        row.get(0)
    })?;
    Ok(value)
}

/// Reserve `count` contiguous flat IDs for `prefix` in one statement.
///
/// Returns the inclusive `(first, last)` ordinals of the reserved range.
/// Concurrent writers each get disjoint ranges.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn reserve_range(tx: &Transaction<'_>, prefix: &str, count: i64) -> Result<(i64, i64)> {
    debug_assert!(count >= 1);
    let last: i64 = tx.query_row(NEXT_ID_SQL, rusqlite::params![prefix, count], |row| {
        row.get(0)
    })?;
    Ok((last - count + 1, last))
}

/// Advance the child ordinal counter for `parent_id` and return the new
/// ordinal (1-based).
///
/// The caller is responsible for checking that the parent exists and that
/// depth limits hold; this function only hands out the next number.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn next_child_number(tx: &Transaction<'_>, parent_id: &str) -> Result<i64> {
    let value = tx.query_row(
        "INSERT INTO child_counters (parent_id, last_child) VALUES (?1, 1)
         ON CONFLICT(parent_id) DO UPDATE SET last_child = last_child + 1
         RETURNING last_child",
        [parent_id],
        |row| row.get(0),
    )?;
    Ok(value)
}

/// Rebuild all flat counters from the issues table.
///
/// Two passes: drop counter rows whose prefix no longer has any
/// numeric-suffix issues, then upsert every remaining prefix to the
/// current corpus max. The overwrite is unconditional, so a counter that
/// ran ahead of the corpus (reserved but unused IDs) is lowered back down.
///
/// # Errors
///
/// Returns an error if either statement fails.
pub fn resync_all(tx: &Transaction<'_>) -> Result<usize> {
    tx.execute(
        "DELETE FROM issue_counters
         WHERE prefix NOT IN (
             SELECT DISTINCT substr(id, 1, instr(id, '-') - 1)
             FROM issues
             WHERE instr(id, '-') > 0
               AND substr(id, instr(id, '-') + 1) GLOB '[0-9]*'
               AND substr(id, instr(id, '-') + 1) NOT GLOB '*[^0-9]*'
         )",
        [],
    )?;

    let updated = tx.execute(
        "INSERT INTO issue_counters (prefix, last_id)
         SELECT substr(id, 1, instr(id, '-') - 1),
                MAX(CAST(substr(id, instr(id, '-') + 1) AS INTEGER))
         FROM issues
         WHERE instr(id, '-') > 0
           AND substr(id, instr(id, '-') + 1) GLOB '[0-9]*'
           AND substr(id, instr(id, '-') + 1) NOT GLOB '*[^0-9]*'
         GROUP BY substr(id, 1, instr(id, '-') - 1)
         ON CONFLICT(prefix) DO UPDATE SET last_id = excluded.last_id",
        [],
    )?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;
    use rusqlite::Connection;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn insert_issue(conn: &Connection, id: &str) {
        conn.execute(
            "INSERT INTO issues (id, title, status, priority, issue_type, created_at, updated_at)
             VALUES (?1, 'x', 'open', 2, 'task', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [id],
        )
        .unwrap();
    }

    #[test]
    fn counter_starts_at_one() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        assert_eq!(next_value(&tx, "bw").unwrap(), 1);
        assert_eq!(next_value(&tx, "bw").unwrap(), 2);
    }

    #[test]
    fn counter_seeds_from_existing_numeric_ids() {
        let mut conn = test_conn();
        insert_issue(&conn, "bw-7");
        insert_issue(&conn, "bw-12");
        insert_issue(&conn, "bw-a3f8e9"); // hash IDs never feed the counter
        let tx = conn.transaction().unwrap();
        assert_eq!(next_value(&tx, "bw").unwrap(), 13);
    }

    #[test]
    fn counter_catches_up_after_manual_insert() {
        let mut conn = test_conn();
        {
            let tx = conn.transaction().unwrap();
            assert_eq!(next_value(&tx, "bw").unwrap(), 1);
            tx.commit().unwrap();
        }
        insert_issue(&conn, "bw-50");
        let tx = conn.transaction().unwrap();
        assert_eq!(next_value(&tx, "bw").unwrap(), 51);
    }

    #[test]
    fn counters_are_per_prefix() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        assert_eq!(next_value(&tx, "bw").unwrap(), 1);
        assert_eq!(next_value(&tx, "api").unwrap(), 1);
        assert_eq!(next_value(&tx, "bw").unwrap(), 2);
    }

    #[test]
    fn range_reservation_is_contiguous() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let (start, end) = reserve_range(&tx, "bw", 5).unwrap();
        assert_eq!((start, end), (1, 5));
        let (start, end) = reserve_range(&tx, "bw", 3).unwrap();
        assert_eq!((start, end), (6, 8));
    }

    #[test]
    fn child_numbers_are_sequential_per_parent() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        assert_eq!(next_child_number(&tx, "bw-abc").unwrap(), 1);
        assert_eq!(next_child_number(&tx, "bw-abc").unwrap(), 2);
        assert_eq!(next_child_number(&tx, "bw-def").unwrap(), 1);
        assert_eq!(next_child_number(&tx, "bw-abc.1").unwrap(), 1);
    }

    #[test]
    fn resync_rebuilds_from_corpus() {
        let mut conn = test_conn();
        insert_issue(&conn, "bw-3");
        insert_issue(&conn, "bw-9");
        insert_issue(&conn, "api-2");
        {
            let tx = conn.transaction().unwrap();
            // Run the counter far ahead of the corpus.
            reserve_range(&tx, "bw", 100).unwrap();
            tx.commit().unwrap();
        }
        {
            let tx = conn.transaction().unwrap();
            resync_all(&tx).unwrap();
            tx.commit().unwrap();
        }
        let tx = conn.transaction().unwrap();
        // Lowered back to corpus max; next mint follows the corpus.
        assert_eq!(next_value(&tx, "bw").unwrap(), 10);
        assert_eq!(next_value(&tx, "api").unwrap(), 3);
    }

    #[test]
    fn resync_drops_stale_prefixes() {
        let mut conn = test_conn();
        {
            let tx = conn.transaction().unwrap();
            next_value(&tx, "gone").unwrap();
            tx.commit().unwrap();
        }
        {
            let tx = conn.transaction().unwrap();
            resync_all(&tx).unwrap();
            tx.commit().unwrap();
        }
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM issue_counters WHERE prefix = 'gone'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
