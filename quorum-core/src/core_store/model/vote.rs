/*
    vote.rs - Vote model

    One row per (target, user) pair - this uniqueness is the central
    invariant of the voting subsystem. The vote reconciler is the only
    writer: it creates a vote on first click, flips its direction on an
    opposite click, and deletes it on a repeated click.
*/

use super::types::{AnswerId, QuestionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Signed contribution of a single vote in this direction
    pub fn delta(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            VoteDirection::Up => VoteDirection::Down,
            VoteDirection::Down => VoteDirection::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a vote is attached to
///
/// Questions and answers are voted on through the same reconciler; the
/// target only matters when the store routes the counter update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteTarget {
    Question(QuestionId),
    Answer(AnswerId),
}

impl VoteTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            VoteTarget::Question(_) => "question",
            VoteTarget::Answer(_) => "answer",
        }
    }

    pub fn id_str(&self) -> &str {
        match self {
            VoteTarget::Question(id) => id.as_str(),
            VoteTarget::Answer(id) => id.as_str(),
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_str())
    }
}

/// A single user's recorded opinion on a single target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub target: VoteTarget,
    pub user_id: UserId,
    pub direction: VoteDirection,
    pub created_at: Timestamp,
}

impl Vote {
    pub fn new(target: VoteTarget, user_id: UserId, direction: VoteDirection) -> Self {
        Vote {
            target,
            user_id,
            direction,
            created_at: Timestamp::now(),
        }
    }
}
