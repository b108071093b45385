//! Close command implementation.

use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute the close command.
///
/// # Errors
///
/// Returns an error for an unresolvable ID or a storage failure.
pub fn execute(id: &str, reason: Option<&str>, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    let id = storage.resolve_id(id)?;
    let issue = storage.close_issue(&id, reason, &actor)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else if let Some(reason) = reason {
        println!("Closed {id}: {reason}");
    } else {
        println!("Closed {id}");
    }
    Ok(())
}
