//! Issue and label validation.
//!
//! Runs before any database mutation so a bad issue never costs a
//! transaction. Field checks are exhaustive over the closed model enums.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BurrowError, Result, ValidationError};
use crate::model::{Issue, Status};

/// Maximum title length in characters.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Maximum length for long-form text fields.
pub const MAX_TEXT_LENGTH: usize = 100_000;

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._:/-]*$").unwrap_or_else(|_| unreachable!()));

/// Validates issues before insert or import.
pub struct IssueValidator;

impl IssueValidator {
    /// Check every field of an issue, collecting all failures.
    ///
    /// # Errors
    ///
    /// Returns the full list of field violations.
    pub fn validate(issue: &Issue) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let title = issue.title.trim();
        if title.is_empty() {
            errors.push(ValidationError::new("title", "must not be empty"));
        } else if issue.title.chars().count() > MAX_TITLE_LENGTH {
            errors.push(ValidationError::new(
                "title",
                format!("exceeds {MAX_TITLE_LENGTH} characters"),
            ));
        }

        if !issue.priority.is_valid() {
            errors.push(ValidationError::new(
                "priority",
                format!("{} out of range 0-4", issue.priority.0),
            ));
        }

        for (field, value) in [
            ("description", &issue.description),
            ("design", &issue.design),
            ("acceptance_criteria", &issue.acceptance_criteria),
            ("notes", &issue.notes),
        ] {
            if let Some(text) = value {
                if text.chars().count() > MAX_TEXT_LENGTH {
                    errors.push(ValidationError::new(
                        field,
                        format!("exceeds {MAX_TEXT_LENGTH} characters"),
                    ));
                }
            }
        }

        // closed_at is set iff status == closed.
        match (issue.status, issue.closed_at.is_some()) {
            (Status::Closed, false) => {
                errors.push(ValidationError::new(
                    "closed_at",
                    "closed issue must carry a closed_at timestamp",
                ));
            }
            (Status::Closed, true) => {}
            (_, true) => {
                errors.push(ValidationError::new(
                    "closed_at",
                    "only closed issues may carry closed_at",
                ));
            }
            (_, false) => {}
        }

        for label in &issue.labels {
            if !LABEL_RE.is_match(label) {
                errors.push(ValidationError::new(
                    "labels",
                    format!("invalid label '{label}'"),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Validate a single label.
///
/// Labels are lowercase alphanumerics plus `._:/-`, starting with an
/// alphanumeric.
///
/// # Errors
///
/// Returns a validation error for malformed labels.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || label.len() > 100 {
        return Err(BurrowError::validation(
            "label",
            "must be 1-100 characters",
        ));
    }
    if !LABEL_RE.is_match(label) {
        return Err(BurrowError::validation(
            "label",
            format!("invalid label '{label}': lowercase alphanumerics and ._:/- only"),
        ));
    }
    Ok(())
}
