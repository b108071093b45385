//! Delete command: permanent removal.

use std::io::{self, BufRead, Write};

use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute the delete command.
///
/// Prompts for confirmation unless `--yes` was given.
///
/// # Errors
///
/// Returns an error for an unresolvable ID or a storage failure.
pub fn execute(id: &str, yes: bool, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    let id = storage.resolve_id(id)?;

    if !yes && !confirm(&id)? {
        println!("Aborted.");
        return Ok(());
    }

    storage.delete_issue(&id, &actor)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted {id}");
    }
    Ok(())
}

fn confirm(id: &str) -> Result<bool> {
    print!("Permanently delete {id}? [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
