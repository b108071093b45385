//! Core data types for burrow.
//!
//! - `Issue` - the work item aggregate
//! - `Status`, `Priority`, `IssueType` - closed field enums
//! - `Dependency`, `Comment`, `Event` - owned relations
//! - `OrphanPolicy` - batch-import handling of missing parents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Issue lifecycle status.
///
/// Deliberately a closed set: validation logic matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Blocked,
    Deferred,
    Closed,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Deferred => "deferred",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = crate::error::BurrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "deferred" => Ok(Self::Deferred),
            "closed" => Ok(Self::Closed),
            other => Err(crate::error::BurrowError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Issue priority (0=Critical, 4=Backlog).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const CRITICAL: Self = Self(0);
    pub const HIGH: Self = Self(1);
    pub const MEDIUM: Self = Self(2);
    pub const LOW: Self = Self(3);
    pub const BACKLOG: Self = Self(4);

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0 && self.0 <= 4
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = crate::error::BurrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();
        let val = s.strip_prefix('P').unwrap_or(&s);

        match val.parse::<i32>() {
            Ok(p) if (0..=4).contains(&p) => Ok(Self(p)),
            _ => Err(crate::error::BurrowError::InvalidPriority {
                priority: val.parse().unwrap_or(-1),
            }),
        }
    }
}

/// Issue type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Feature,
    Epic,
    Chore,
}

impl IssueType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Epic => "epic",
            Self::Chore => "chore",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = crate::error::BurrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "bug" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "epic" => Ok(Self::Epic),
            "chore" => Ok(Self::Chore),
            other => Err(crate::error::BurrowError::InvalidType {
                issue_type: other.to_string(),
            }),
        }
    }
}

/// Dependency relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    Blocks,
    ParentChild,
    Related,
}

impl DependencyType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::ParentChild => "parent-child",
            Self::Related => "related",
        }
    }

    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocks | Self::ParentChild)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = crate::error::BurrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocks" => Ok(Self::Blocks),
            "parent-child" => Ok(Self::ParentChild),
            "related" => Ok(Self::Related),
            other => Err(crate::error::BurrowError::validation(
                "dependency_type",
                format!("unknown type '{other}' (blocks, parent-child, related)"),
            )),
        }
    }
}

/// How a batch allocation treats a hierarchical issue whose parent is absent
/// from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Fail the whole batch.
    Strict,
    /// Succeed only if the missing parent is created by the same batch.
    Resurrect,
    /// Drop the orphaned issue from the batch.
    Skip,
    /// Proceed without parent validation.
    #[default]
    Allow,
}

impl OrphanPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Resurrect => "resurrect",
            Self::Skip => "skip",
            Self::Allow => "allow",
        }
    }
}

impl FromStr for OrphanPolicy {
    type Err = crate::error::BurrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "resurrect" => Ok(Self::Resurrect),
            "skip" => Ok(Self::Skip),
            "allow" => Ok(Self::Allow),
            other => Err(crate::error::BurrowError::validation(
                "orphan_handling",
                format!("unknown policy '{other}' (strict, resurrect, skip, allow)"),
            )),
        }
    }
}

/// Audit event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Updated,
    StatusChanged,
    Commented,
    Closed,
    Reopened,
    DependencyAdded,
    DependencyRemoved,
    LabelAdded,
    LabelRemoved,
    Deleted,
    Custom(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StatusChanged => "status_changed",
            Self::Commented => "commented",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
            Self::DependencyAdded => "dependency_added",
            Self::DependencyRemoved => "dependency_removed",
            Self::LabelAdded => "label_added",
            Self::LabelRemoved => "label_removed",
            Self::Deleted => "deleted",
            Self::Custom(value) => value,
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        let event_type = match value.as_str() {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "status_changed" => Self::StatusChanged,
            "commented" => Self::Commented,
            "closed" => Self::Closed,
            "reopened" => Self::Reopened,
            "dependency_added" => Self::DependencyAdded,
            "dependency_removed" => Self::DependencyRemoved,
            "label_added" => Self::LabelAdded,
            "label_removed" => Self::LabelRemoved,
            "deleted" => Self::Deleted,
            _ => Self::Custom(value),
        };
        Ok(event_type)
    }
}

/// The primary issue entity.
///
/// Invariant: `closed_at` is set if and only if `status == Closed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Issue {
    /// Unique ID (e.g., "bw-a3f8e9", "bw-42", "bw-a3f8e9.1.2").
    ///
    /// Empty string means "not yet assigned"; the storage layer mints an ID
    /// at insert time.
    #[serde(default)]
    pub id: String,

    /// Content hash for deduplication and change detection.
    #[serde(skip)]
    pub content_hash: Option<String>,

    /// Title (1-500 chars).
    pub title: String,

    /// Detailed description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Technical design notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,

    /// Acceptance criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,

    /// Additional notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Workflow status.
    #[serde(default)]
    pub status: Status,

    /// Priority (0=Critical, 4=Backlog).
    #[serde(default)]
    pub priority: Priority,

    /// Issue type (bug, feature, etc.).
    #[serde(default)]
    pub issue_type: IssueType,

    /// Assigned user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Creator username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// Last update timestamp.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Closure timestamp. Set iff status is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Reason for closure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,

    /// Due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,

    /// Defer until date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_until: Option<DateTime<Utc>>,

    /// External reference (e.g., JIRA-123).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,

    // Relations (populated for export/display).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dependencies: Vec<Dependency>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Construct a minimal open issue with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }

    /// Compute the deterministic content hash for this issue.
    ///
    /// Includes: title, description, design, `acceptance_criteria`, notes,
    /// status, priority, `issue_type`, assignee, `external_ref`.
    /// Excludes: id, timestamps, relations.
    #[must_use]
    pub fn compute_content_hash(&self) -> String {
        let mut hasher = Sha256::new();

        let mut update = |s: &str| {
            hasher.update(s.as_bytes());
            hasher.update([0]);
        };

        update(&self.title);
        update(self.description.as_deref().unwrap_or(""));
        update(self.design.as_deref().unwrap_or(""));
        update(self.acceptance_criteria.as_deref().unwrap_or(""));
        update(self.notes.as_deref().unwrap_or(""));
        update(self.status.as_str());
        update(&self.priority.0.to_string());
        update(self.issue_type.as_str());
        update(self.assignee.as_deref().unwrap_or(""));
        update(self.external_ref.as_deref().unwrap_or(""));

        format!("{:x}", hasher.finalize())
    }
}

/// Relationship between two issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    /// The issue that has the dependency (source).
    pub issue_id: String,

    /// The issue being depended on (target).
    pub depends_on_id: String,

    /// Type of dependency.
    #[serde(rename = "type")]
    pub dep_type: DependencyType,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub issue_id: String,
    pub author: String,
    #[serde(rename = "text")]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// An entry in the issue's audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub issue_id: String,
    pub event_type: EventType,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_rejects_unknown() {
        assert!(Status::from_str("tombstone").is_err());
        assert_eq!(Status::from_str("in_progress").unwrap(), Status::InProgress);
    }

    #[test]
    fn orphan_policy_parses_all_variants() {
        for (s, p) in [
            ("strict", OrphanPolicy::Strict),
            ("resurrect", OrphanPolicy::Resurrect),
            ("skip", OrphanPolicy::Skip),
            ("allow", OrphanPolicy::Allow),
        ] {
            assert_eq!(OrphanPolicy::from_str(s).unwrap(), p);
        }
        assert!(OrphanPolicy::from_str("ignore").is_err());
    }

    #[test]
    fn priority_parses_with_and_without_p() {
        assert_eq!(Priority::from_str("2").unwrap(), Priority::MEDIUM);
        assert_eq!(Priority::from_str("P0").unwrap(), Priority::CRITICAL);
        assert!(Priority::from_str("5").is_err());
    }

    #[test]
    fn issue_deserialize_defaults_missing_fields() {
        let json = r#"{
            "title": "Test issue",
            "status": "open",
            "priority": 2,
            "issue_type": "task",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert!(issue.id.is_empty());
        assert!(issue.description.is_none());
        assert!(issue.labels.is_empty());
    }

    #[test]
    fn content_hash_deterministic_and_ignores_timestamps() {
        let mut issue = Issue::new("Test Issue");
        let h1 = issue.compute_content_hash();
        issue.updated_at = Utc::now();
        let h2 = issue.compute_content_hash();
        assert_eq!(h1, h2);

        issue.title = "Other".to_string();
        assert_ne!(h1, issue.compute_content_hash());
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let issue = Issue::new("x");
        let hash = issue.compute_content_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
