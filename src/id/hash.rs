//! Content hashing for ID candidates.
//!
//! A candidate digest is a pure function of issue content, creator,
//! creation timestamp (nanosecond resolution), and a small nonce. The
//! nonce exists only so a colliding candidate can be re-derived
//! differently; retry orchestration lives in the storage layer.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Build the seed string for a candidate digest.
///
/// Layout: `title|description|creator|created_at_nanos|nonce`. Nanosecond
/// timestamps keep batch-created issues with identical text distinguishable.
#[must_use]
pub fn candidate_seed(
    title: &str,
    description: Option<&str>,
    creator: Option<&str>,
    created_at: DateTime<Utc>,
    nonce: u32,
) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        title,
        description.unwrap_or(""),
        creator.unwrap_or(""),
        created_at.timestamp_nanos_opt().unwrap_or(0),
        nonce
    )
}

/// SHA-256 digest of a candidate seed.
#[must_use]
pub fn candidate_digest(seed: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}
