//! Issue ID grammar: parsing, validation, and hierarchy helpers.
//!
//! ID formats:
//! - flat: `<prefix>-<decimal>` (e.g. `bw-42`)
//! - hash: `<prefix>-<suffix>` with `suffix` drawn from `0-9a-z` (base36) or
//!   `0-9a-f` (legacy hex), adaptive length
//! - hierarchical: `<parent-id>.<n>`, up to [`MAX_CHILD_DEPTH`] appended
//!   levels

pub mod adaptive;
pub mod encode;
pub mod hash;

use crate::error::{BurrowError, Result};

/// Maximum number of hierarchy levels below a root issue.
pub const MAX_CHILD_DEPTH: usize = 3;

/// Parsed components of an issue ID.
///
/// Supports both root IDs (`bw-a3f8e9`) and hierarchical IDs
/// (`bw-a3f8e9.1.2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    /// The prefix (e.g., "bw").
    pub prefix: String,
    /// The root suffix: hash chars or decimal counter digits.
    pub root: String,
    /// Child path segments (e.g. `[1, 2]` for `.1.2`).
    pub child_path: Vec<u32>,
}

impl ParsedId {
    /// Returns true if this is a root (non-hierarchical) ID.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.child_path.is_empty()
    }

    /// Depth in the hierarchy (0 for root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.child_path.len()
    }

    /// The parent ID, or `None` for root IDs.
    #[must_use]
    pub fn parent(&self) -> Option<String> {
        if self.child_path.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.child_path.pop();
        Some(parent.to_id_string())
    }

    /// Reconstruct the full ID string.
    #[must_use]
    pub fn to_id_string(&self) -> String {
        use std::fmt::Write as _;
        let mut out = format!("{}-{}", self.prefix, self.root);
        for segment in &self.child_path {
            let _ = write!(out, ".{segment}");
        }
        out
    }
}

/// Parse an issue ID into its components.
///
/// # Errors
///
/// Returns `InvalidId` if the ID format is invalid.
pub fn parse_id(id: &str) -> Result<ParsedId> {
    let Some(dash_pos) = id.find('-') else {
        return Err(BurrowError::InvalidId { id: id.to_string() });
    };

    let prefix = &id[..dash_pos];
    let remainder = &id[dash_pos + 1..];

    if prefix.is_empty()
        || remainder.is_empty()
        || !prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(BurrowError::InvalidId { id: id.to_string() });
    }

    let mut parts = remainder.split('.');
    let root = parts.next().unwrap_or("").to_string();

    // Root suffix is base36 lowercase; this also covers plain decimal
    // counters and legacy hex digests.
    if root.is_empty()
        || !root.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(BurrowError::InvalidId { id: id.to_string() });
    }

    let mut child_path = Vec::new();
    for part in parts {
        match part.parse::<u32>() {
            Ok(n) if n > 0 => child_path.push(n),
            _ => return Err(BurrowError::InvalidId { id: id.to_string() }),
        }
    }

    if child_path.len() > MAX_CHILD_DEPTH {
        return Err(BurrowError::InvalidId { id: id.to_string() });
    }

    Ok(ParsedId {
        prefix: prefix.to_string(),
        root,
        child_path,
    })
}

/// Hierarchy depth of an ID string (0 for roots and unparseable input).
#[must_use]
pub fn id_depth(id: &str) -> usize {
    id.find('-').map_or(0, |pos| id[pos + 1..].matches('.').count())
}

/// Format a child ID from a parent and ordinal.
#[must_use]
pub fn child_id(parent_id: &str, child_number: i64) -> String {
    format!("{parent_id}.{child_number}")
}

/// Validate that an ID parses and carries the expected prefix.
///
/// # Errors
///
/// Returns `InvalidId` for malformed IDs and `PrefixMismatch` when the
/// prefix differs from `expected`.
pub fn validate_prefix(id: &str, expected: &str) -> Result<ParsedId> {
    let parsed = parse_id(id)?;
    if parsed.prefix == expected {
        Ok(parsed)
    } else {
        Err(BurrowError::PrefixMismatch {
            expected: expected.to_string(),
            found: parsed.prefix,
        })
    }
}

/// Normalize an ID to its canonical lowercase form.
#[must_use]
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// True if the suffix of a flat ID is purely decimal (counter-minted).
#[must_use]
pub fn is_numeric_suffix(root: &str) -> bool {
    !root.is_empty() && root.chars().all(|c| c.is_ascii_digit())
}
