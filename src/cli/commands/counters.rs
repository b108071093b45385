//! Counter inspection and resync.

use crate::cli::CounterCommands;
use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute a counters subcommand.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the rebuild
/// fails.
pub fn execute(command: &CounterCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;

    match command {
        CounterCommands::Sync => {
            let actor = config::resolve_actor(cli);
            let count = storage.resync_counters(&actor)?;
            if json {
                println!("{}", serde_json::json!({ "prefixes": count }));
            } else {
                println!("Resynced {count} prefix counter(s).");
            }
        }
        CounterCommands::Show => {
            let counters = storage.get_counters()?;
            if json {
                let map: std::collections::BTreeMap<_, _> = counters.into_iter().collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else if counters.is_empty() {
                println!("No counters.");
            } else {
                for (prefix, last_id) in &counters {
                    println!("{prefix}: {last_id}");
                }
            }
        }
    }
    Ok(())
}
