//! CLI definitions and argument types.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Local issue tracker (`SQLite`-backed)
#[derive(Parser, Debug)]
#[command(name = "bur", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (auto-discover .burrow/burrow.db if not set)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Actor name for the audit trail
    #[arg(long, global = true, env = "BURROW_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a burrow workspace
    Init {
        /// Issue ID prefix (e.g., "bw")
        #[arg(long)]
        prefix: Option<String>,

        /// Use flat sequential IDs instead of content hashes
        #[arg(long)]
        flat: bool,

        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Create a new issue
    Create(CreateArgs),

    /// Quick capture (create and print only the ID)
    Q(QuickArgs),

    /// Show issue details
    Show {
        /// Issue IDs (full or partial)
        ids: Vec<String>,
    },

    /// List issues
    List(ListArgs),

    /// Search issues by text
    Search(SearchArgs),

    /// Update an issue
    Update(UpdateArgs),

    /// Close an issue
    Close {
        /// Issue ID
        id: String,

        /// Close reason
        #[arg(long)]
        reason: Option<String>,
    },

    /// Reopen a closed issue
    Reopen {
        /// Issue ID
        id: String,
    },

    /// Delete an issue permanently
    Delete {
        /// Issue ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Manage dependencies
    Dep {
        #[command(subcommand)]
        command: DepCommands,
    },

    /// Manage labels
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },

    /// Manage comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Get or set configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Import issues from a JSONL file
    Import(ImportArgs),

    /// Export all issues as JSONL
    Export {
        /// Output file (stdout if omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Inspect or rebuild ID counters
    Counters {
        #[command(subcommand)]
        command: CounterCommands,
    },

    /// Show project statistics
    Stats,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Issue title
    pub title: String,

    /// Description
    #[arg(long, short)]
    pub description: Option<String>,

    /// Priority (0-4 or P0-P4)
    #[arg(long, short)]
    pub priority: Option<String>,

    /// Issue type (task, bug, feature, epic, chore)
    #[arg(long = "type", short = 't')]
    pub issue_type: Option<String>,

    /// Assignee
    #[arg(long, short)]
    pub assignee: Option<String>,

    /// Labels (repeatable)
    #[arg(long, short)]
    pub label: Vec<String>,

    /// Parent issue: mints a hierarchical child ID
    #[arg(long)]
    pub parent: Option<String>,

    /// Explicit issue ID (must match the configured prefix)
    #[arg(long)]
    pub id: Option<String>,

    /// Due date (+2d, tomorrow, 2026-01-15, RFC3339)
    #[arg(long)]
    pub due: Option<String>,

    /// Defer until date
    #[arg(long)]
    pub defer: Option<String>,

    /// External reference (e.g., JIRA-123)
    #[arg(long)]
    pub external_ref: Option<String>,
}

#[derive(Args, Debug)]
pub struct QuickArgs {
    /// Issue title
    pub title: String,

    /// Priority (0-4 or P0-P4)
    #[arg(long, short)]
    pub priority: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status (repeatable)
    #[arg(long, short)]
    pub status: Vec<String>,

    /// Filter by type (repeatable)
    #[arg(long = "type", short = 't')]
    pub issue_type: Vec<String>,

    /// Filter by priority (repeatable)
    #[arg(long, short)]
    pub priority: Vec<String>,

    /// Filter by assignee
    #[arg(long, short)]
    pub assignee: Option<String>,

    /// Only unassigned issues
    #[arg(long)]
    pub unassigned: bool,

    /// Include closed issues
    #[arg(long)]
    pub all: bool,

    /// Filter by label (repeatable, all must match)
    #[arg(long, short)]
    pub label: Vec<String>,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Sort field (priority, created, updated, title)
    #[arg(long)]
    pub sort: Option<String>,

    /// Reverse sort order
    #[arg(long, short)]
    pub reverse: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (matches title, description, ID)
    pub query: String,

    /// Include closed issues
    #[arg(long)]
    pub all: bool,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Issue ID
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(long, short)]
    pub description: Option<String>,

    /// New status (open, in_progress, blocked, deferred, closed)
    #[arg(long, short)]
    pub status: Option<String>,

    /// New priority (0-4 or P0-P4)
    #[arg(long, short)]
    pub priority: Option<String>,

    /// New issue type
    #[arg(long = "type", short = 't')]
    pub issue_type: Option<String>,

    /// New assignee (empty string clears)
    #[arg(long, short)]
    pub assignee: Option<String>,

    /// New notes
    #[arg(long)]
    pub notes: Option<String>,

    /// New due date
    #[arg(long)]
    pub due: Option<String>,

    /// New defer-until date
    #[arg(long)]
    pub defer: Option<String>,

    /// New external reference
    #[arg(long)]
    pub external_ref: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum DepCommands {
    /// Add a dependency: <from> depends on <to>
    Add {
        from: String,
        to: String,

        /// Dependency type (blocks, parent-child, related)
        #[arg(long = "type", short = 't', default_value = "blocks")]
        dep_type: String,
    },

    /// Remove a dependency
    Remove { from: String, to: String },

    /// List dependencies of an issue
    List { id: String },
}

#[derive(Subcommand, Debug)]
pub enum LabelCommands {
    /// Add a label to an issue
    Add { id: String, label: String },

    /// Remove a label from an issue
    Remove { id: String, label: String },

    /// List labels of an issue
    List { id: String },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Add a comment to an issue
    Add { id: String, text: String },

    /// List comments of an issue
    List { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a config value
    Get { key: String },

    /// Set a config value
    Set { key: String, value: String },

    /// Delete a config value
    Unset { key: String },

    /// List all config values
    List,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSONL file to import
    pub file: PathBuf,

    /// Orphan handling (strict, resurrect, skip, allow); defaults to the
    /// `orphan_handling` config key, then "allow"
    #[arg(long)]
    pub orphans: Option<String>,

    /// Validate and assign IDs without committing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum CounterCommands {
    /// Rebuild all prefix counters from the issues table
    Sync,

    /// Show current counter values
    Show,
}
