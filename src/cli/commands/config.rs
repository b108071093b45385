//! Config subcommands.

use crate::cli::ConfigCommands;
use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute a config subcommand.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the statement
/// fails.
pub fn execute(command: &ConfigCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;

    match command {
        ConfigCommands::Get { key } => match storage.get_config(key)? {
            Some(value) => println!("{value}"),
            None => println!("(not set)"),
        },
        ConfigCommands::Set { key, value } => {
            storage.set_config(key, value)?;
            println!("{key} = {value}");
        }
        ConfigCommands::Unset { key } => {
            if storage.delete_config(key)? {
                println!("Removed {key}");
            } else {
                println!("{key} was not set");
            }
        }
        ConfigCommands::List => {
            let all = storage.get_all_config()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                let mut keys: Vec<_> = all.keys().collect();
                keys.sort();
                for key in keys {
                    println!("{key} = {}", all[key]);
                }
            }
        }
    }
    Ok(())
}
