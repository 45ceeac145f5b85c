//! The vote reconciler
//!
//! Converges the stored vote row and the target's denormalized counter
//! to reflect exactly one of {no vote, up, down} per (target, user),
//! using the fewest store operations: one vote mutation, then one
//! counter write. The counter is pure delta arithmetic on the prior
//! count the caller supplied - the authoritative sum is never re-read.
//!
//! The two writes are separate store calls with no transaction around
//! them. A failure between them leaves the counter stale relative to
//! the vote rows; nothing here rolls back or retries, the caller
//! surfaces the error and the user re-triggers. Likewise, two sessions
//! voting concurrently race on the counter and the later write wins.

use super::plan::{plan_vote, VoteAction};
use crate::core_auth::errors::AuthError;
use crate::core_auth::{policy, SessionStore};
use crate::core_store::changes::{ChangeFeed, ChangeTopic};
use crate::core_store::errors::StoreError;
use crate::core_store::model::{Identity, Vote, VoteDirection, VoteTarget};
use crate::core_store::traits::DataStore;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by [`VoteReconciler::apply_vote`]
#[derive(Debug, Error)]
pub enum VoteError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the caller gets back: the new vote state and the new counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub vote: Option<VoteDirection>,
    pub vote_count: i64,
}

/// Applies vote transitions against the data store
pub struct VoteReconciler<S: DataStore> {
    store: Arc<S>,
    session: Arc<SessionStore>,
    changes: Arc<ChangeFeed>,
}

impl<S: DataStore> VoteReconciler<S> {
    pub fn new(store: Arc<S>, session: Arc<SessionStore>, changes: Arc<ChangeFeed>) -> Self {
        VoteReconciler {
            store,
            session,
            changes,
        }
    }

    /// Apply one click when the caller does not know the prior vote.
    /// Looks the prior vote up first, then proceeds as
    /// [`apply_vote_with_prior`](Self::apply_vote_with_prior).
    pub async fn apply_vote(
        &self,
        target: &VoteTarget,
        requested: VoteDirection,
        prior_count: i64,
    ) -> Result<VoteOutcome, VoteError> {
        let identity = policy::require_identity(&self.session)?;
        policy::ensure_not_banned(&identity)?;

        let prior = self
            .store
            .find_vote(target, &identity.user_id)
            .await?
            .map(|v| v.direction);

        self.execute(&identity, target, requested, prior, prior_count)
            .await
    }

    /// Apply one click when the caller already holds the prior vote
    /// state (e.g. from an annotated listing row). No lookup is issued.
    pub async fn apply_vote_with_prior(
        &self,
        target: &VoteTarget,
        requested: VoteDirection,
        prior: Option<VoteDirection>,
        prior_count: i64,
    ) -> Result<VoteOutcome, VoteError> {
        let identity = policy::require_identity(&self.session)?;
        policy::ensure_not_banned(&identity)?;

        self.execute(&identity, target, requested, prior, prior_count)
            .await
    }

    async fn execute(
        &self,
        identity: &Identity,
        target: &VoteTarget,
        requested: VoteDirection,
        prior: Option<VoteDirection>,
        prior_count: i64,
    ) -> Result<VoteOutcome, VoteError> {
        let plan = plan_vote(prior, requested);
        debug!(
            target = %target,
            user = %identity.user_id,
            ?prior,
            requested = %requested,
            delta = plan.delta,
            "applying vote"
        );

        // Vote mutation first, then the counter write. No transaction
        // spans the pair; see the module docs for the drift window.
        match plan.action {
            VoteAction::Create(direction) => {
                let vote = Vote::new(target.clone(), identity.user_id.clone(), direction);
                self.store.create_vote(&vote).await?;
                counter!("quorum.votes.created").increment(1);
            }
            VoteAction::Flip(direction) => {
                self.store
                    .update_vote(target, &identity.user_id, direction)
                    .await?;
                counter!("quorum.votes.flipped").increment(1);
            }
            VoteAction::Remove => {
                self.store.delete_vote(target, &identity.user_id).await?;
                counter!("quorum.votes.removed").increment(1);
            }
        }

        let vote_count = prior_count + plan.delta;
        self.store.set_vote_count(target, vote_count).await?;

        self.changes.publish(ChangeTopic::Votes);

        Ok(VoteOutcome {
            vote: plan.next,
            vote_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_store::memory::MemoryStore;
    use crate::core_store::model::{Profile, Question, Role, UserId};
    use super::VoteDirection::{Down, Up};

    struct Fixture {
        store: Arc<MemoryStore>,
        session: Arc<SessionStore>,
        reconciler: VoteReconciler<MemoryStore>,
        target: VoteTarget,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new());
        let changes = Arc::new(ChangeFeed::default());

        let author = Profile::new(UserId::generate(), "author".to_string());
        store.insert_profile(&author).await.unwrap();
        let question = Question::new(
            "Why is the sky blue?".to_string(),
            "Asking seriously.".to_string(),
            vec![],
            author.user_id.clone(),
        );
        store.insert_question(&question).await.unwrap();

        let reconciler =
            VoteReconciler::new(store.clone(), session.clone(), changes.clone());

        Fixture {
            store,
            session,
            reconciler,
            target: VoteTarget::Question(question.id),
        }
    }

    fn sign_in(session: &SessionStore, role: Role) -> UserId {
        let mut profile = Profile::new(UserId::generate(), "voter".to_string());
        profile.role = role;
        let identity = profile.identity();
        let user_id = identity.user_id.clone();
        session.sign_in(identity);
        user_id
    }

    #[tokio::test]
    async fn test_first_up_vote_then_toggle_off() {
        let fx = fixture().await;
        sign_in(&fx.session, Role::User);

        let outcome = fx.reconciler.apply_vote(&fx.target, Up, 0).await.unwrap();
        assert_eq!(outcome.vote, Some(Up));
        assert_eq!(outcome.vote_count, 1);

        // Second identical click removes the vote and restores the count
        let outcome = fx
            .reconciler
            .apply_vote(&fx.target, Up, outcome.vote_count)
            .await
            .unwrap();
        assert_eq!(outcome.vote, None);
        assert_eq!(outcome.vote_count, 0);
    }

    #[tokio::test]
    async fn test_up_then_down_is_minus_two() {
        let fx = fixture().await;
        sign_in(&fx.session, Role::User);

        let after_up = fx.reconciler.apply_vote(&fx.target, Up, 0).await.unwrap();
        let after_down = fx
            .reconciler
            .apply_vote(&fx.target, Down, after_up.vote_count)
            .await
            .unwrap();

        assert_eq!(after_down.vote, Some(Down));
        // Baseline 0: up takes it to +1, the flip lands at -1
        assert_eq!(after_down.vote_count, -1);
    }

    #[tokio::test]
    async fn test_full_cycle_returns_to_baseline() {
        // count=10, no vote; up -> 11, down -> 9, down again -> 10
        let fx = fixture().await;
        sign_in(&fx.session, Role::User);
        fx.store.set_vote_count(&fx.target, 10).await.unwrap();

        let a = fx.reconciler.apply_vote(&fx.target, Up, 10).await.unwrap();
        assert_eq!((a.vote, a.vote_count), (Some(Up), 11));

        let b = fx
            .reconciler
            .apply_vote(&fx.target, Down, a.vote_count)
            .await
            .unwrap();
        assert_eq!((b.vote, b.vote_count), (Some(Down), 9));

        let c = fx
            .reconciler
            .apply_vote(&fx.target, Down, b.vote_count)
            .await
            .unwrap();
        assert_eq!((c.vote, c.vote_count), (None, 10));
    }

    #[tokio::test]
    async fn test_three_identical_clicks_end_voted() {
        let fx = fixture().await;
        sign_in(&fx.session, Role::User);

        let mut count = 0;
        let mut vote = None;
        for _ in 0..3 {
            let outcome = fx.reconciler.apply_vote(&fx.target, Up, count).await.unwrap();
            count = outcome.vote_count;
            vote = outcome.vote;
        }
        assert_eq!(vote, Some(Up));
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_vote_issues_zero_store_calls() {
        let fx = fixture().await;
        let ops_before = fx.store.op_count();

        let err = fx.reconciler.apply_vote(&fx.target, Up, 0).await.unwrap_err();
        assert!(matches!(err, VoteError::Auth(AuthError::AuthRequired)));
        assert_eq!(fx.store.op_count(), ops_before);
    }

    #[tokio::test]
    async fn test_banned_user_denied_without_store_calls() {
        let fx = fixture().await;
        sign_in(&fx.session, Role::Banned);
        let ops_before = fx.store.op_count();

        let err = fx.reconciler.apply_vote(&fx.target, Up, 0).await.unwrap_err();
        assert!(matches!(err, VoteError::Auth(AuthError::AuthzDenied(_))));
        assert_eq!(fx.store.op_count(), ops_before);
    }

    #[tokio::test]
    async fn test_with_prior_skips_lookup() {
        let fx = fixture().await;
        let user_id = sign_in(&fx.session, Role::User);

        // Establish an up-vote through the normal path
        fx.reconciler.apply_vote(&fx.target, Up, 0).await.unwrap();

        // Caller passes the known prior; reconciler flips without reading
        let outcome = fx
            .reconciler
            .apply_vote_with_prior(&fx.target, Down, Some(Up), 1)
            .await
            .unwrap();
        assert_eq!(outcome.vote, Some(Down));
        assert_eq!(outcome.vote_count, -1);

        let stored = fx.store.find_vote(&fx.target, &user_id).await.unwrap().unwrap();
        assert_eq!(stored.direction, Down);
    }

    #[tokio::test]
    async fn test_counter_survives_stale_prior_count() {
        // Last write wins: a stale prior_count produces a stale counter,
        // not an error. The drift is the documented trade-off.
        let fx = fixture().await;
        sign_in(&fx.session, Role::User);
        fx.store.set_vote_count(&fx.target, 10).await.unwrap();

        let outcome = fx.reconciler.apply_vote(&fx.target, Up, 3).await.unwrap();
        assert_eq!(outcome.vote_count, 4);
    }
}
