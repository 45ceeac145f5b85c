//! SQLite persistence for the Q&A store
//!
//! Provides the pooled rusqlite implementation of the DataStore trait.

pub mod migrations;
pub mod sql_store;

pub use migrations::{migrate, CURRENT_SCHEMA_VERSION};
pub use sql_store::SqliteStore;
