//! Persistent storage: schema, counters, ID allocation, and the `SQLite`
//! facade.

pub mod counters;
pub mod events;
pub mod ids;
pub mod schema;
pub mod sqlite;

pub use ids::{IdContext, IdMode};
pub use sqlite::{IssueUpdate, ListFilters, MutationContext, SqliteStorage};
