//! quorum-core - Q&A community platform core
//!
//! The domain logic of a questions-and-answers community: voting with
//! denormalized score reconciliation, a dual authorization model
//! (identity roles plus a separate admin-session gate), listing and
//! search, moderation, badges and notifications. Persistence sits
//! behind the [`core_store::DataStore`] trait with in-memory and SQLite
//! implementations.

pub mod config;
pub mod core_admin;
pub mod core_auth;
pub mod core_forum;
pub mod core_notify;
pub mod core_query;
pub mod core_store;
pub mod core_vote;
pub mod logging;
pub mod metrics;

// Re-export commonly used types
pub use config::Config;
pub use core_auth::{AdminGate, AdminSessionState, AuthError, SessionStore};
pub use core_store::{
    ChangeFeed, DataStore, MemoryStore, Role, SortKey, SqliteStore, StoreError, Timestamp, UserId,
    VoteDirection, VoteTarget,
};
pub use core_vote::{VoteOutcome, VoteReconciler};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = VoteDirection::Up;
        let _ = SortKey::Newest;
    }
}
