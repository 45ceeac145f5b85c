/*
    question.rs - Question model

    A question carries three denormalized counters:
    - vote_count: incrementally adjusted by the vote reconciler, never
      recomputed from the votes table on read
    - answer_count: maintained by the store on answer insert/delete
    - view_count: bumped once per detail fetch
*/

use super::types::{QuestionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A question posted to the community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique question ID
    pub id: QuestionId,

    /// Short title shown in listings
    pub title: String,

    /// Full question body
    pub body: String,

    /// Free-form tags for search and discovery
    pub tags: Vec<String>,

    /// Author of the question
    pub author_id: UserId,

    /// Denormalized sum of vote deltas for this question
    pub vote_count: i64,

    /// Number of answers currently attached
    pub answer_count: u32,

    /// Number of detail views
    pub view_count: u64,

    /// When the question was asked
    pub created_at: Timestamp,

    /// Last edit time
    pub updated_at: Timestamp,
}

impl Question {
    /// Create a new question with zeroed counters
    pub fn new(title: String, body: String, tags: Vec<String>, author_id: UserId) -> Self {
        let now = Timestamp::now();
        Question {
            id: QuestionId::generate(),
            title,
            body,
            tags,
            author_id,
            vote_count: 0,
            answer_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_unanswered(&self) -> bool {
        self.answer_count == 0
    }
}

/// Fields an edit may change; everything else is immutable after posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPatch {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_question_counters_start_at_zero() {
        let q = Question::new(
            "How do I frobnicate?".to_string(),
            "Details inside.".to_string(),
            vec!["frobnication".to_string()],
            UserId::generate(),
        );
        assert_eq!(q.vote_count, 0);
        assert_eq!(q.answer_count, 0);
        assert_eq!(q.view_count, 0);
        assert!(q.is_unanswered());
    }
}
