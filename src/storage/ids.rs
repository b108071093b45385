//! ID generation against live storage.
//!
//! Orchestrates the pure pieces under [`crate::id`] (hashing, encoding,
//! adaptive length) with collision probes and counter advances inside the
//! caller's transaction. Nothing here commits; every function proposes or
//! claims IDs within a transaction the caller owns, so any error rolls the
//! whole operation back.

use std::collections::HashSet;

use rusqlite::{OptionalExtension, Transaction};
use tracing::debug;

use crate::error::{BurrowError, Result};
use crate::id::adaptive::{self, AdaptiveConfig};
use crate::id::encode::{self, Encoding, MAX_SUFFIX_LENGTH};
use crate::id::hash;
use crate::id::{self, MAX_CHILD_DEPTH};
use crate::model::{Issue, OrphanPolicy};
use crate::storage::counters;

/// Nonce values tried per candidate length before moving to a longer
/// suffix.
pub const NONCE_LIMIT: u32 = 10;

/// How root IDs are minted for a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdMode {
    /// Content-hash suffixes with adaptive length.
    #[default]
    Hash,
    /// Sequential decimal counters.
    Flat,
}

impl IdMode {
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        match value {
            "flat" => Self::Flat,
            _ => Self::Hash,
        }
    }
}

/// Per-database ID-generation settings, snapshotted from the config table
/// at the start of a minting transaction.
#[derive(Debug, Clone)]
pub struct IdContext {
    pub prefix: String,
    pub mode: IdMode,
    pub encoding: Encoding,
    pub adaptive: AdaptiveConfig,
}

impl IdContext {
    /// Load ID settings from the config table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if `issue_prefix` is not set. A missing
    /// prefix is never repaired here: minting under a guessed prefix
    /// would scatter issues across namespaces.
    pub fn load(tx: &Transaction<'_>) -> Result<Self> {
        let prefix = config_get(tx, "issue_prefix")?.ok_or(BurrowError::ConfigMissing {
            key: "issue_prefix".to_string(),
        })?;

        let mode = config_get(tx, "id_mode")?
            .map(|v| IdMode::from_config(&v))
            .unwrap_or_default();
        let encoding = config_get(tx, "hash_encoding")?
            .map(|v| Encoding::from_config(&v))
            .unwrap_or_default();

        let defaults = AdaptiveConfig::default();
        let adaptive = AdaptiveConfig {
            max_collision_prob: config_parse(tx, "max_collision_prob")?
                .unwrap_or(defaults.max_collision_prob),
            min_length: config_parse(tx, "min_hash_length")?.unwrap_or(defaults.min_length),
            max_length: config_parse(tx, "max_hash_length")?.unwrap_or(defaults.max_length),
        };

        Ok(Self {
            prefix,
            mode,
            encoding,
            adaptive,
        })
    }
}

/// Read a single config value inside the current transaction.
pub(crate) fn config_get(tx: &Transaction<'_>, key: &str) -> Result<Option<String>> {
    let value = tx
        .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn config_parse<T: std::str::FromStr>(tx: &Transaction<'_>, key: &str) -> Result<Option<T>> {
    Ok(config_get(tx, key)?.and_then(|v| v.parse().ok()))
}

/// Count top-level (non-hierarchical) issues under a prefix.
///
/// Feeds the adaptive length estimator; child issues are excluded because
/// they never occupy the hash space.
pub fn count_top_level_issues(tx: &Transaction<'_>, prefix: &str) -> Result<usize> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM issues WHERE id LIKE ?1 || '-%' AND id NOT LIKE '%.%'",
        [prefix],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn id_exists(tx: &Transaction<'_>, candidate: &str) -> Result<bool> {
    let exists = tx
        .prepare_cached("SELECT 1 FROM issues WHERE id = ?1")?
        .exists([candidate])?;
    Ok(exists)
}

/// Mint one root ID for `issue`.
///
/// Flat mode takes the next counter value. Hash mode searches
/// `(length, nonce)` pairs from the adaptive base length up to the hard
/// ceiling, probing the issues table and the in-batch `claimed` set; the
/// first free candidate wins.
///
/// The candidate is only proposed, not inserted; the caller must insert it
/// in the same transaction for the probe to be meaningful.
///
/// # Errors
///
/// Returns `IdSpaceExhausted` when every combination collides, with the
/// attempted range so an operator can see how saturated the prefix is.
pub fn generate_issue_id(
    tx: &Transaction<'_>,
    ctx: &IdContext,
    issue: &Issue,
    claimed: &HashSet<String>,
) -> Result<String> {
    if ctx.mode == IdMode::Flat {
        let value = counters::next_value(tx, &ctx.prefix)?;
        return Ok(format!("{}-{}", ctx.prefix, value));
    }

    let corpus = count_top_level_issues(tx, &ctx.prefix)?;
    let base_length = adaptive::optimal_length(corpus, &ctx.adaptive);
    debug!(
        prefix = %ctx.prefix,
        corpus,
        base_length,
        "generating hash id"
    );

    for length in base_length..=MAX_SUFFIX_LENGTH {
        for nonce in 0..NONCE_LIMIT {
            let seed = hash::candidate_seed(
                &issue.title,
                issue.description.as_deref(),
                issue.created_by.as_deref(),
                issue.created_at,
                nonce,
            );
            let digest = hash::candidate_digest(&seed);
            let suffix = encode::encode_suffix(&digest, length, ctx.encoding);
            let candidate = format!("{}-{}", ctx.prefix, suffix);

            if !claimed.contains(&candidate) && !id_exists(tx, &candidate)? {
                return Ok(candidate);
            }
        }
    }

    Err(BurrowError::IdSpaceExhausted {
        prefix: ctx.prefix.clone(),
        min_length: base_length,
        max_length: MAX_SUFFIX_LENGTH,
        nonce_limit: NONCE_LIMIT,
    })
}

/// Mint the next hierarchical child ID under `parent_id`.
///
/// # Errors
///
/// Returns `ParentNotFound` if the parent issue does not exist and
/// `DepthExceeded` if the parent already sits at the maximum depth.
pub fn next_child_id(tx: &Transaction<'_>, parent_id: &str) -> Result<String> {
    if !id_exists(tx, parent_id)? {
        return Err(BurrowError::ParentNotFound {
            parent: parent_id.to_string(),
            child: String::new(),
        });
    }

    if id::id_depth(parent_id) >= MAX_CHILD_DEPTH {
        return Err(BurrowError::DepthExceeded {
            parent: parent_id.to_string(),
            max_depth: MAX_CHILD_DEPTH,
        });
    }

    let ordinal = counters::next_child_number(tx, parent_id)?;
    Ok(id::child_id(parent_id, ordinal))
}

/// Outcome of a batch allocation: indices of issues dropped by the `skip`
/// orphan policy. All other issues have their `id` field assigned.
pub type SkippedIndices = Vec<usize>;

/// Assign final IDs to every issue in a batch.
///
/// Explicit IDs are validated first, in hierarchy-depth order so that a
/// to-be-created parent is registered before any of its children are
/// resolved (input order is otherwise preserved). Issues without IDs are
/// then generated, probing both the table and the in-batch claimed set.
///
/// Nothing is inserted here; the caller inserts the batch in the same
/// transaction and rolls back on any error, so a failed batch leaves
/// storage untouched.
///
/// # Errors
///
/// Propagates prefix, orphan, collision, and exhaustion failures per the
/// policy rules; any error means no IDs from this batch are durable.
pub fn ensure_batch_ids(
    tx: &Transaction<'_>,
    ctx: &IdContext,
    issues: &mut [Issue],
    policy: OrphanPolicy,
) -> Result<SkippedIndices> {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut skipped = Vec::new();

    // Resolve explicit IDs parents-first.
    let mut explicit: Vec<usize> = (0..issues.len())
        .filter(|&i| !issues[i].id.is_empty())
        .collect();
    explicit.sort_by_key(|&i| id::id_depth(&issues[i].id));

    for idx in explicit {
        let raw = id::normalize_id(&issues[idx].id);
        let parsed = id::validate_prefix(&raw, &ctx.prefix)?;

        if let Some(parent) = parsed.parent() {
            let in_storage = id_exists(tx, &parent)?;
            // Strict demands the parent be durable already; the other
            // policies accept a parent created earlier in this batch.
            let resolved = in_storage
                || (policy != OrphanPolicy::Strict && claimed.contains(&parent));
            if !resolved {
                match policy {
                    OrphanPolicy::Strict | OrphanPolicy::Resurrect => {
                        return Err(BurrowError::ParentNotFound {
                            parent,
                            child: raw,
                        });
                    }
                    OrphanPolicy::Skip => {
                        debug!(id = %raw, parent = %parent, "skipping orphan in batch");
                        issues[idx].id.clear();
                        skipped.push(idx);
                        continue;
                    }
                    OrphanPolicy::Allow => {}
                }
            }
        }

        if claimed.contains(&raw) || id_exists(tx, &raw)? {
            return Err(BurrowError::IdCollision { id: raw });
        }

        issues[idx].id = raw.clone();
        claimed.insert(raw);
    }

    let need: Vec<usize> = (0..issues.len())
        .filter(|&i| issues[i].id.is_empty() && !skipped.contains(&i))
        .collect();
    if need.is_empty() {
        return Ok(skipped);
    }

    if ctx.mode == IdMode::Flat {
        // One counter round trip for the whole batch.
        let count = i64::try_from(need.len()).unwrap_or(i64::MAX);
        let (start, _) = counters::reserve_range(tx, &ctx.prefix, count)?;
        let mut value = start;
        let mut disturbed = false;
        for idx in need {
            if disturbed {
                value = counters::next_value(tx, &ctx.prefix)?;
            }
            let mut candidate = format!("{}-{}", ctx.prefix, value);
            // An explicit numeric ID in this batch may sit inside the
            // reserved range. Once that happens the remaining block is no
            // longer covered by the counter, so every ordinal after the
            // collision is taken from the counter directly; the committed
            // counter must never trail a committed suffix.
            while claimed.contains(&candidate) {
                disturbed = true;
                value = counters::next_value(tx, &ctx.prefix)?;
                candidate = format!("{}-{}", ctx.prefix, value);
            }
            issues[idx].id = candidate.clone();
            claimed.insert(candidate);
            value += 1;
        }
    } else {
        for idx in need {
            let candidate = generate_issue_id(tx, ctx, &issues[idx], &claimed)?;
            issues[idx].id = candidate.clone();
            claimed.insert(candidate);
        }
    }

    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;
    use chrono::{TimeZone, Utc};
    use rusqlite::Connection;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('issue_prefix', 'bw')",
            [],
        )
        .unwrap();
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

    fn sample_issue(title: &str) -> Issue {
        let mut issue = Issue::new(title.to_string());
        issue.created_by = Some("tester".to_string());
        issue.created_at = Utc.timestamp_opt(1_700_000_000, 42).unwrap();
        issue.updated_at = issue.created_at;
        issue
    }

    #[test]
    fn context_requires_prefix() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        let tx = conn.transaction().unwrap();
        assert!(matches!(
            IdContext::load(&tx),
            Err(BurrowError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn context_reads_tunables() {
        let mut conn = test_conn();
        conn.execute(
            "INSERT INTO config (key, value) VALUES
                 ('id_mode', 'flat'),
                 ('max_collision_prob', '0.1'),
                 ('min_hash_length', '5')",
            [],
        )
        .unwrap();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        assert_eq!(ctx.prefix, "bw");
        assert_eq!(ctx.mode, IdMode::Flat);
        assert!((ctx.adaptive.max_collision_prob - 0.1).abs() < f64::EPSILON);
        assert_eq!(ctx.adaptive.min_length, 5);
        assert_eq!(ctx.adaptive.max_length, 8);
    }

    #[test]
    fn generated_id_is_deterministic_for_same_content() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let issue = sample_issue("Deterministic");
        let claimed = HashSet::new();
        let a = generate_issue_id(&tx, &ctx, &issue, &claimed).unwrap();
        let b = generate_issue_id(&tx, &ctx, &issue, &claimed).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("bw-"));
    }

    #[test]
    fn generated_id_avoids_existing_rows() {
        let mut conn = test_conn();
        let issue = sample_issue("Collides");
        let first = {
            let tx = conn.transaction().unwrap();
            let ctx = IdContext::load(&tx).unwrap();
            generate_issue_id(&tx, &ctx, &issue, &HashSet::new()).unwrap()
        };
        insert_issue(&conn, &first);
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let second = generate_issue_id(&tx, &ctx, &issue, &HashSet::new()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn flat_mode_uses_counter() {
        let mut conn = test_conn();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('id_mode', 'flat')",
            [],
        )
        .unwrap();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let issue = sample_issue("Flat");
        let a = generate_issue_id(&tx, &ctx, &issue, &HashSet::new()).unwrap();
        let b = generate_issue_id(&tx, &ctx, &issue, &HashSet::new()).unwrap();
        assert_eq!(a, "bw-1");
        assert_eq!(b, "bw-2");
    }

    #[test]
    fn child_id_requires_existing_parent() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        assert!(matches!(
            next_child_id(&tx, "bw-missing"),
            Err(BurrowError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn child_id_depth_boundary() {
        let mut conn = test_conn();
        insert_issue(&conn, "bw-a3f8e9");
        insert_issue(&conn, "bw-a3f8e9.1");
        insert_issue(&conn, "bw-a3f8e9.1.1");
        insert_issue(&conn, "bw-a3f8e9.1.1.1");
        let tx = conn.transaction().unwrap();
        assert_eq!(next_child_id(&tx, "bw-a3f8e9").unwrap(), "bw-a3f8e9.1");
        assert_eq!(
            next_child_id(&tx, "bw-a3f8e9.1.1").unwrap(),
            "bw-a3f8e9.1.1.1"
        );
        assert!(matches!(
            next_child_id(&tx, "bw-a3f8e9.1.1.1"),
            Err(BurrowError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn child_ordinals_increment() {
        let mut conn = test_conn();
        insert_issue(&conn, "bw-root");
        let tx = conn.transaction().unwrap();
        assert_eq!(next_child_id(&tx, "bw-root").unwrap(), "bw-root.1");
        assert_eq!(next_child_id(&tx, "bw-root").unwrap(), "bw-root.2");
    }

    #[test]
    fn batch_assigns_all_missing_ids_uniquely() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut issues: Vec<Issue> = (0..5)
            .map(|i| {
                let mut issue = sample_issue("Same title");
                issue.created_at = Utc.timestamp_opt(1_700_000_000, i).unwrap();
                issue
            })
            .collect();
        let skipped = ensure_batch_ids(&tx, &ctx, &mut issues, OrphanPolicy::Strict).unwrap();
        assert!(skipped.is_empty());
        let ids: HashSet<_> = issues.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn batch_rejects_wrong_prefix() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut issue = sample_issue("Wrong prefix");
        issue.id = "other-123".to_string();
        let mut batch = vec![issue];
        assert!(matches!(
            ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Allow),
            Err(BurrowError::PrefixMismatch { .. })
        ));
    }

    #[test]
    fn batch_rejects_duplicate_explicit_ids() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut a = sample_issue("a");
        let mut b = sample_issue("b");
        a.id = "bw-dup1".to_string();
        b.id = "bw-dup1".to_string();
        let mut batch = vec![a, b];
        assert!(matches!(
            ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Allow),
            Err(BurrowError::IdCollision { .. })
        ));
    }

    #[test]
    fn orphan_strict_fails_batch() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut child = sample_issue("orphan child");
        child.id = "bw-ghost.1".to_string();
        let mut batch = vec![child];
        assert!(matches!(
            ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Strict),
            Err(BurrowError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn orphan_resurrect_needs_parent_in_batch() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();

        // Child listed before parent: depth ordering still resolves it.
        let mut child = sample_issue("child");
        child.id = "bw-parent1.1".to_string();
        let mut parent = sample_issue("parent");
        parent.id = "bw-parent1".to_string();
        let mut batch = vec![child, parent];
        let skipped =
            ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Resurrect).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(batch[0].id, "bw-parent1.1");

        // Parent nowhere in the batch: fails.
        let mut lone = sample_issue("lone child");
        lone.id = "bw-ghost.1".to_string();
        let mut batch = vec![lone];
        assert!(matches!(
            ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Resurrect),
            Err(BurrowError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn orphan_skip_drops_child() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut child = sample_issue("skipped child");
        child.id = "bw-ghost.1".to_string();
        let keeper = sample_issue("keeper");
        let mut batch = vec![child, keeper];
        let skipped = ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Skip).unwrap();
        assert_eq!(skipped, vec![0]);
        assert!(batch[0].id.is_empty());
        assert!(!batch[1].id.is_empty());
    }

    #[test]
    fn orphan_allow_keeps_dangling_child() {
        let mut conn = test_conn();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut child = sample_issue("dangling child");
        child.id = "bw-ghost.1".to_string();
        let mut batch = vec![child];
        let skipped = ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Allow).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(batch[0].id, "bw-ghost.1");
    }

    #[test]
    fn flat_batch_counter_covers_explicit_collisions() {
        let mut conn = test_conn();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('id_mode', 'flat')",
            [],
        )
        .unwrap();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();

        // Explicit bw-2 lands inside the range reserved for the three
        // generated issues.
        let mut explicit = sample_issue("explicit");
        explicit.id = "bw-2".to_string();
        let mut batch = vec![explicit];
        batch.extend((0..3).map(|_| sample_issue("bulk")));
        ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Allow).unwrap();

        let ids: HashSet<_> = batch.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids.len(), 4);

        let max_suffix = batch
            .iter()
            .map(|i| i.id.trim_start_matches("bw-").parse::<i64>().unwrap())
            .max()
            .unwrap();
        let counter: i64 = tx
            .query_row(
                "SELECT last_id FROM issue_counters WHERE prefix = 'bw'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(
            counter >= max_suffix,
            "counter {counter} lags behind existing issue bw-{max_suffix}"
        );
    }

    #[test]
    fn flat_batch_reserves_contiguous_range() {
        let mut conn = test_conn();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('id_mode', 'flat')",
            [],
        )
        .unwrap();
        let tx = conn.transaction().unwrap();
        let ctx = IdContext::load(&tx).unwrap();
        let mut batch: Vec<Issue> = (0..4).map(|_| sample_issue("bulk")).collect();
        ensure_batch_ids(&tx, &ctx, &mut batch, OrphanPolicy::Allow).unwrap();
        let ids: Vec<_> = batch.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["bw-1", "bw-2", "bw-3", "bw-4"]);
    }
}
