/*
    answer.rs - Answer model

    Answers carry their own denormalized vote_count, adjusted by the vote
    reconciler exactly like the question counter. At most one answer per
    question may have is_accepted set; the forum service enforces this.
*/

use super::types::{AnswerId, QuestionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// An answer to a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Unique answer ID
    pub id: AnswerId,

    /// Question this answer belongs to
    pub question_id: QuestionId,

    /// Author of the answer
    pub author_id: UserId,

    /// Answer body
    pub body: String,

    /// Denormalized sum of vote deltas for this answer
    pub vote_count: i64,

    /// Whether the question author accepted this answer
    pub is_accepted: bool,

    /// When the answer was posted
    pub created_at: Timestamp,
}

impl Answer {
    /// Create a new, unaccepted answer
    pub fn new(question_id: QuestionId, author_id: UserId, body: String) -> Self {
        Answer {
            id: AnswerId::generate(),
            question_id,
            author_id,
            body,
            vote_count: 0,
            is_accepted: false,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_answer_is_unaccepted() {
        let a = Answer::new(
            QuestionId::generate(),
            UserId::generate(),
            "Use the frobnicator.".to_string(),
        );
        assert!(!a.is_accepted);
        assert_eq!(a.vote_count, 0);
    }
}
