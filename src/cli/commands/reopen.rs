//! Reopen command implementation.

use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute the reopen command.
///
/// # Errors
///
/// Returns an error for an unresolvable ID or a storage failure.
pub fn execute(id: &str, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    let id = storage.resolve_id(id)?;
    let issue = storage.reopen_issue(&id, &actor)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        println!("Reopened {id}");
    }
    Ok(())
}
