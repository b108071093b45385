//! Comment subcommands.

use crate::cli::CommentCommands;
use crate::config::{self, CliOverrides};
use crate::error::Result;

/// Execute a comment subcommand.
///
/// # Errors
///
/// Returns an error for unresolvable IDs or storage failures.
pub fn execute(command: &CommentCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    match command {
        CommentCommands::Add { id, text } => {
            let id = storage.resolve_id(id)?;
            let comment = storage.add_comment(&id, &actor, text)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comment)?);
            } else {
                println!("Added comment #{} to {id}", comment.id);
            }
        }
        CommentCommands::List { id } => {
            let id = storage.resolve_id(id)?;
            let comments = storage.get_comments(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
            } else if comments.is_empty() {
                println!("{id} has no comments");
            } else {
                for comment in &comments {
                    println!(
                        "[{}] {}: {}",
                        comment.created_at.format("%Y-%m-%d %H:%M"),
                        comment.author,
                        comment.body
                    );
                }
            }
        }
    }
    Ok(())
}
