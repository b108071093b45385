//! Error types for burrow.
//!
//! Structured variants for everything the storage and ID layers can report,
//! with an `Other` escape hatch for wrapped anyhow errors at the edges.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for burrow operations.
#[derive(Error, Debug)]
pub enum BurrowError {
    // === Workspace / storage ===
    /// Workspace not initialized (no `.burrow` directory found).
    #[error("Not initialized: run 'bur init' first")]
    NotInitialized,

    /// Workspace already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Issues ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// Attempted to create an issue with an ID that already exists.
    #[error("Issue ID collision: {id}")]
    IdCollision { id: String },

    /// Partial ID matches multiple issues.
    #[error("Ambiguous ID '{partial}': matches {matches:?}")]
    AmbiguousId {
        partial: String,
        matches: Vec<String>,
    },

    /// Issue ID format is invalid.
    #[error("Invalid issue ID format: {id}")]
    InvalidId { id: String },

    // === ID generation ===
    /// Required configuration key is absent; never auto-repaired, since
    /// minting IDs under a guessed prefix would poison the ID space.
    #[error("Configuration missing: '{key}' is not set")]
    ConfigMissing { key: String },

    /// Explicit issue ID doesn't match the configured prefix.
    #[error("Prefix mismatch: expected '{expected}', found '{found}'")]
    PrefixMismatch { expected: String, found: String },

    /// Hierarchical ID references a parent that doesn't exist.
    #[error("Parent issue not found: {parent} (required by {child})")]
    ParentNotFound { parent: String, child: String },

    /// Hierarchy depth limit reached.
    #[error("Maximum hierarchy depth ({max_depth}) exceeded for parent {parent}")]
    DepthExceeded { parent: String, max_depth: usize },

    /// No unique candidate found within the length/nonce search space.
    #[error(
        "ID space exhausted for prefix '{prefix}': tried lengths {min_length}-{max_length} with {nonce_limit} nonces each"
    )]
    IdSpaceExhausted {
        prefix: String,
        min_length: usize,
        max_length: usize,
        nonce_limit: u32,
    },

    // === Validation ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid issue type value.
    #[error("Invalid issue type: {issue_type}")]
    InvalidType { issue_type: String },

    /// Priority out of valid range (0-4).
    #[error("Priority must be 0-4, got: {priority}")]
    InvalidPriority { priority: i32 },

    // === Dependencies ===
    /// Adding the dependency would create a cycle.
    #[error("Cycle detected in dependencies: {path}")]
    DependencyCycle { path: String },

    /// Self-referential dependency.
    #[error("Issue cannot depend on itself: {id}")]
    SelfDependency { id: String },

    /// Duplicate dependency.
    #[error("Dependency already exists: {from} -> {to}")]
    DuplicateDependency { from: String, to: String },

    // === Import ===
    /// Failed to parse a line in a JSONL file.
    #[error("JSONL parse error at line {line}: {reason}")]
    JsonlParse { line: usize, reason: String },

    // === I/O ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl BurrowError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::IssueNotFound { .. }
                | Self::AmbiguousId { .. }
                | Self::Validation { .. }
                | Self::InvalidStatus { .. }
                | Self::InvalidType { .. }
                | Self::InvalidPriority { .. }
                | Self::PrefixMismatch { .. }
                | Self::ConfigMissing { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: bur init"),
            Self::AmbiguousId { .. } => Some("Provide more characters of the ID"),
            Self::ConfigMissing { .. } => Some("Run: bur config set issue_prefix <prefix>"),
            Self::DependencyCycle { .. } => Some("Remove one dependency to break the cycle"),
            Self::SelfDependency { .. } => Some("An issue cannot depend on itself"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::InvalidPriority { .. } => {
                Some("Use a priority between 0 (critical) and 4 (backlog)")
            }
            Self::InvalidStatus { .. } => {
                Some("Valid statuses: open, in_progress, blocked, deferred, closed")
            }
            Self::InvalidType { .. } => Some("Valid types: task, bug, feature, epic, chore"),
            Self::IdSpaceExhausted { .. } => {
                Some("The hash ID space for this prefix is near saturation; raise max_hash_length")
            }
            _ => None,
        }
    }

    /// Exit code for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of validation errors into a single error value.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `BurrowError`.
pub type Result<T> = std::result::Result<T, BurrowError>;
