//! burrow - embedded issue tracker with collision-resistant IDs.
//!
//! The interesting part of this crate is the identifier subsystem: issue IDs
//! are either flat counter-based (`bw-42`), content-derived hashes with
//! adaptive length (`bw-a3f8e9`), or hierarchical child IDs (`bw-a3f8e9.1.2`).
//! All minting happens inside `SQLite` IMMEDIATE transactions so that multiple
//! processes sharing one database file can never reserve the same ID.

pub mod cli;
pub mod config;
pub mod error;
pub mod id;
pub mod logging;
pub mod model;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{BurrowError, Result};
pub use storage::SqliteStorage;
