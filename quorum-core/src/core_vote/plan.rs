//! The vote decision table
//!
//! Pure state machine: given the prior vote and the requested direction,
//! decide the single store mutation and the signed counter delta. The
//! reconciler executes plans; this module only computes them.
//!
//! Click-to-toggle semantics: requesting the direction already recorded
//! removes the vote, requesting the opposite flips it, requesting with
//! no prior vote creates one. No plan is idempotent on its own - two
//! identical requests round-trip back to no-vote.

use crate::core_store::model::VoteDirection;

/// The single store mutation a plan calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    /// No prior vote: create one in the requested direction
    Create(VoteDirection),
    /// Prior vote in the opposite direction: flip it
    Flip(VoteDirection),
    /// Prior vote in the requested direction: remove it
    Remove,
}

/// A computed transition: what to do, what it does to the counter,
/// and the vote state afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePlan {
    pub action: VoteAction,
    /// Signed adjustment to the denormalized counter
    pub delta: i64,
    /// Vote state after the plan executes
    pub next: Option<VoteDirection>,
}

/// Compute the transition for one click.
///
/// | prior | requested | action | delta |
/// |-------|-----------|--------|-------|
/// | none  | up        | create | +1    |
/// | none  | down      | create | -1    |
/// | up    | up        | remove | -1    |
/// | down  | down      | remove | +1    |
/// | up    | down      | flip   | -2    |
/// | down  | up        | flip   | +2    |
pub fn plan_vote(prior: Option<VoteDirection>, requested: VoteDirection) -> VotePlan {
    match prior {
        None => VotePlan {
            action: VoteAction::Create(requested),
            delta: requested.delta(),
            next: Some(requested),
        },
        Some(prior) if prior == requested => VotePlan {
            action: VoteAction::Remove,
            delta: -prior.delta(),
            next: None,
        },
        Some(prior) => VotePlan {
            action: VoteAction::Flip(requested),
            delta: requested.delta() - prior.delta(),
            next: Some(requested),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use super::VoteDirection::{Down, Up};

    #[test]
    fn test_decision_table() {
        let cases = [
            (None, Up, VoteAction::Create(Up), 1, Some(Up)),
            (None, Down, VoteAction::Create(Down), -1, Some(Down)),
            (Some(Up), Up, VoteAction::Remove, -1, None),
            (Some(Down), Down, VoteAction::Remove, 1, None),
            (Some(Up), Down, VoteAction::Flip(Down), -2, Some(Down)),
            (Some(Down), Up, VoteAction::Flip(Up), 2, Some(Up)),
        ];

        for (prior, requested, action, delta, next) in cases {
            let plan = plan_vote(prior, requested);
            assert_eq!(plan.action, action, "prior={:?} req={:?}", prior, requested);
            assert_eq!(plan.delta, delta, "prior={:?} req={:?}", prior, requested);
            assert_eq!(plan.next, next, "prior={:?} req={:?}", prior, requested);
        }
    }

    #[test]
    fn test_two_identical_clicks_round_trip() {
        for direction in [Up, Down] {
            let first = plan_vote(None, direction);
            let second = plan_vote(first.next, direction);
            assert_eq!(first.delta + second.delta, 0);
            assert_eq!(second.next, None);
        }
    }

    fn direction_strategy() -> impl Strategy<Value = VoteDirection> {
        prop_oneof![Just(Up), Just(Down)]
    }

    proptest! {
        /// Folding any click sequence through the table keeps the counter
        /// equal to the contribution of the final vote state: +1 for up,
        /// -1 for down, 0 for none.
        #[test]
        fn prop_counter_always_matches_state(clicks in prop::collection::vec(direction_strategy(), 0..40)) {
            let mut state: Option<VoteDirection> = None;
            let mut counter: i64 = 0;

            for click in clicks {
                let plan = plan_vote(state, click);
                counter += plan.delta;
                state = plan.next;
            }

            let expected = state.map(|d| d.delta()).unwrap_or(0);
            prop_assert_eq!(counter, expected);
        }

        /// An odd number of identical clicks ends voted, an even number
        /// ends unvoted.
        #[test]
        fn prop_identical_click_parity(direction in direction_strategy(), n in 0usize..20) {
            let mut state: Option<VoteDirection> = None;
            for _ in 0..n {
                state = plan_vote(state, direction).next;
            }
            if n % 2 == 0 {
                prop_assert_eq!(state, None);
            } else {
                prop_assert_eq!(state, Some(direction));
            }
        }
    }
}
