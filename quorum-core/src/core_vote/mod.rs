//! Voting subsystem
//!
//! Split into the pure decision table ([`plan`]) and the reconciler that
//! executes plans against the store ([`reconciler`]).

pub mod plan;
pub mod reconciler;

pub use plan::{plan_vote, VoteAction, VotePlan};
pub use reconciler::{VoteError, VoteOutcome, VoteReconciler};
