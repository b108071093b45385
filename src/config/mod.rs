//! Workspace discovery and runtime configuration.
//!
//! A burrow workspace is a `.burrow/` directory containing `burrow.db`.
//! Discovery walks up from the current directory, with the `BURROW_DIR`
//! environment variable as an override. Per-database settings (prefix,
//! ID mode, adaptive tunables) live in the database's own config table,
//! not in files.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BurrowError, Result};
use crate::storage::SqliteStorage;

/// Name of the workspace directory.
pub const WORKSPACE_DIR: &str = ".burrow";

/// Name of the database file inside the workspace directory.
pub const DB_FILE: &str = "burrow.db";

/// Environment variable overriding workspace discovery.
pub const ENV_DIR: &str = "BURROW_DIR";

/// Environment variable overriding the actor name.
pub const ENV_ACTOR: &str = "BURROW_ACTOR";

/// Prefix used by `init` when the caller doesn't supply one.
pub const DEFAULT_PREFIX: &str = "bw";

/// Global CLI flags that override discovery and identity.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit database path (`--db`).
    pub db: Option<PathBuf>,
    /// Explicit actor (`--actor`).
    pub actor: Option<String>,
    /// Lock wait in milliseconds (`--lock-timeout`).
    pub lock_timeout_ms: Option<u64>,
}

/// Locate the workspace directory.
///
/// Order: `BURROW_DIR` if set, else walk up from `start` looking for a
/// `.burrow` directory.
#[must_use]
pub fn discover_workspace(start: &Path) -> Option<PathBuf> {
    if let Ok(dir) = env::var(ENV_DIR) {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Some(path);
        }
    }

    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(WORKSPACE_DIR);
        if candidate.is_dir() {
            debug!(path = %candidate.display(), "found workspace");
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

/// Resolve the database path from overrides or discovery.
///
/// # Errors
///
/// Returns `NotInitialized` when no workspace exists and no explicit path
/// was given.
pub fn resolve_db_path(overrides: &CliOverrides) -> Result<PathBuf> {
    if let Some(ref db) = overrides.db {
        return Ok(db.clone());
    }

    let cwd = env::current_dir()?;
    discover_workspace(&cwd)
        .map(|dir| dir.join(DB_FILE))
        .ok_or(BurrowError::NotInitialized)
}

/// Open storage for an existing workspace.
///
/// # Errors
///
/// Returns `NotInitialized` if discovery fails, or a database error.
pub fn open_storage(overrides: &CliOverrides) -> Result<SqliteStorage> {
    let path = resolve_db_path(overrides)?;
    if overrides.db.is_none() && !path.exists() {
        return Err(BurrowError::NotInitialized);
    }
    SqliteStorage::open_with_timeout(&path, overrides.lock_timeout_ms)
}

/// Create a new workspace at `root/.burrow` and open its database.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the workspace exists, or I/O and
/// database errors.
pub fn init_workspace(root: &Path, overrides: &CliOverrides) -> Result<(SqliteStorage, PathBuf)> {
    let dir = root.join(WORKSPACE_DIR);
    if dir.join(DB_FILE).exists() {
        return Err(BurrowError::AlreadyInitialized { path: dir });
    }
    std::fs::create_dir_all(&dir)?;

    // Keep the database and its WAL sidecars out of version control.
    let gitignore = dir.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, "burrow.db\nburrow.db-wal\nburrow.db-shm\n")?;
    }

    let db_path = dir.join(DB_FILE);
    let storage = SqliteStorage::open_with_timeout(&db_path, overrides.lock_timeout_ms)?;
    Ok((storage, db_path))
}

/// Resolve the acting user: `--actor` > `BURROW_ACTOR` > `USER` >
/// `"unknown"`.
#[must_use]
pub fn resolve_actor(overrides: &CliOverrides) -> String {
    if let Some(ref actor) = overrides.actor {
        return actor.clone();
    }
    if let Ok(actor) = env::var(ENV_ACTOR) {
        if !actor.is_empty() {
            return actor;
        }
    }
    env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_walks_up() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join(".burrow")).unwrap();
        let nested = root.join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = discover_workspace(&nested).unwrap();
        assert_eq!(found, root.join(".burrow"));
    }

    #[test]
    fn discover_returns_none_without_workspace() {
        let tmp = TempDir::new().unwrap();
        assert!(discover_workspace(tmp.path()).is_none());
    }

    #[test]
    fn init_creates_db_and_gitignore() {
        let tmp = TempDir::new().unwrap();
        let overrides = CliOverrides::default();
        let (_storage, db_path) = init_workspace(tmp.path(), &overrides).unwrap();
        assert!(db_path.exists());
        assert!(tmp.path().join(".burrow/.gitignore").exists());

        assert!(matches!(
            init_workspace(tmp.path(), &overrides),
            Err(BurrowError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn actor_prefers_override() {
        let overrides = CliOverrides {
            actor: Some("carol".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_actor(&overrides), "carol");
    }
}
