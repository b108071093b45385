//! Quick capture: create an issue and print only its ID.

use std::str::FromStr;

use crate::cli::QuickArgs;
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::model::{Issue, Priority};

/// Execute the quick-capture command.
///
/// # Errors
///
/// Returns an error for an invalid priority or a storage failure.
pub fn execute(args: &QuickArgs, cli: &CliOverrides) -> Result<()> {
    let mut storage = config::open_storage(cli)?;
    let actor = config::resolve_actor(cli);

    let mut issue = Issue::new(args.title.clone());
    issue.created_by = Some(actor.clone());
    if let Some(ref p) = args.priority {
        issue.priority = Priority::from_str(p)?;
    }

    let id = storage.create_issue(&mut issue, &actor)?;
    println!("{id}");
    Ok(())
}
