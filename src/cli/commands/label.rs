//! Label subcommands.

use crate::cli::LabelCommands;
use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute a label subcommand.
///
/// # Errors
///
/// Returns an error for unresolvable IDs, malformed labels, or storage
/// failures.
pub fn execute(command: &LabelCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    match command {
        LabelCommands::Add { id, label } => {
            let id = storage.resolve_id(id)?;
            let added = storage.add_label(&id, label, &actor)?;
            if added {
                println!("Added label '{label}' to {id}");
            } else {
                println!("{id} already has label '{label}'");
            }
        }
        LabelCommands::Remove { id, label } => {
            let id = storage.resolve_id(id)?;
            let removed = storage.remove_label(&id, label, &actor)?;
            if removed {
                println!("Removed label '{label}' from {id}");
            } else {
                println!("{id} does not have label '{label}'");
            }
        }
        LabelCommands::List { id } => {
            let id = storage.resolve_id(id)?;
            let labels = storage.get_labels(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&labels)?);
            } else if labels.is_empty() {
                println!("{id} has no labels");
            } else {
                for label in &labels {
                    println!("{label}");
                }
            }
        }
    }
    Ok(())
}
