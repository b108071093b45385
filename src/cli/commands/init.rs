//! Init command: create the workspace and seed its configuration.

use std::path::Path;

use tracing::info;

use crate::config::{self, CliOverrides, DEFAULT_PREFIX};
use crate::error::{BurrowError, Result};

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` when a database exists and `--force` was
/// not given, or a validation error for a malformed prefix.
pub fn execute(
    prefix: Option<&str>,
    flat: bool,
    force: bool,
    json: bool,
    cli: &CliOverrides,
) -> Result<()> {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX);
    validate_prefix(prefix)?;

    let root = Path::new(".");
    if force {
        let db = root.join(config::WORKSPACE_DIR).join(config::DB_FILE);
        if db.exists() {
            std::fs::remove_file(&db)?;
            for sidecar in ["-wal", "-shm"] {
                let path = db.with_file_name(format!("{}{sidecar}", config::DB_FILE));
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
    }

    let (mut storage, db_path) = config::init_workspace(root, cli)?;
    storage.set_config("issue_prefix", prefix)?;
    if flat {
        storage.set_config("id_mode", "flat")?;
    }

    info!(path = %db_path.display(), prefix, "initialized workspace");

    if json {
        let out = serde_json::json!({
            "db": db_path,
            "prefix": prefix,
            "id_mode": if flat { "flat" } else { "hash" },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Initialized burrow workspace at {}", db_path.display());
        println!("Issue prefix: {prefix}");
    }
    Ok(())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    let valid = !prefix.is_empty()
        && prefix.len() <= 16
        && prefix.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(BurrowError::validation(
            "prefix",
            "must be 1-16 lowercase alphanumeric characters starting with a letter",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rules() {
        assert!(validate_prefix("bw").is_ok());
        assert!(validate_prefix("proj2").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("2x").is_err());
        assert!(validate_prefix("Bad").is_err());
        assert!(validate_prefix("has-dash").is_err());
    }
}
