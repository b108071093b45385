//! Dependency subcommands.

use std::str::FromStr;

use crate::cli::DepCommands;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::model::DependencyType;

/// Execute a dependency subcommand.
///
/// # Errors
///
/// Returns an error for unresolvable IDs, cycles, duplicates, or storage
/// failures.
pub fn execute(command: &DepCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    match command {
        DepCommands::Add { from, to, dep_type } => {
            let from = storage.resolve_id(from)?;
            let to = storage.resolve_id(to)?;
            let dep_type = DependencyType::from_str(dep_type)?;
            storage.add_dependency(&from, &to, &dep_type, &actor)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "from": from, "to": to, "type": dep_type.as_str() })
                );
            } else {
                println!("{from} now depends on {to} ({dep_type})");
            }
        }
        DepCommands::Remove { from, to } => {
            let from = storage.resolve_id(from)?;
            let to = storage.resolve_id(to)?;
            let removed = storage.remove_dependency(&from, &to, &actor)?;
            if removed {
                println!("Removed dependency {from} -> {to}");
            } else {
                println!("No dependency {from} -> {to}");
            }
        }
        DepCommands::List { id } => {
            let id = storage.resolve_id(id)?;
            let deps = storage.get_dependencies(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&deps)?);
            } else if deps.is_empty() {
                println!("{id} has no dependencies");
            } else {
                for dep in &deps {
                    println!("{} -> {} ({})", dep.issue_id, dep.depends_on_id, dep.dep_type);
                }
            }
        }
    }
    Ok(())
}
