/*
    traits.rs - The data-collaborator boundary

    Everything the platform persists goes through the DataStore trait.
    The hosted backend of a deployment sits behind this boundary; the
    in-tree implementations (memory, sqlite) stand in for it.

    Contract notes:
    - create_vote fails with Conflict if a vote row already exists for
      the (target, user) pair; update_vote/delete_vote fail with
      NotFound if none does. The reconciler relies on these to keep the
      one-vote-per-pair invariant.
    - set_vote_count overwrites the denormalized counter; it never
      recomputes from the votes table. Each call is atomic on its own,
      but no transaction spans a vote mutation and the counter write
      that follows it.
*/

use super::errors::StoreResult;
use super::model::{
    Announcement, AnnouncementId, Answer, AnswerId, Badge, BadgeAward, Notification,
    NotificationId, Profile, Question, QuestionId, QuestionPatch, Role, Timestamp, UserId, Vote,
    VoteDirection, VoteTarget,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sort order for question listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Newest first
    Newest,
    /// Questions with no answers yet, newest first
    Unanswered,
    /// Highest vote count first
    MostVoted,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(SortKey::Newest),
            "unanswered" => Some(SortKey::Unanswered),
            "most-voted" => Some(SortKey::MostVoted),
            _ => None,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Newest
    }
}

/// Store-level question query: filter + sort + window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionQuery {
    /// Case-insensitive match against title, body or tag
    pub search: Option<String>,
    pub sort: SortKey,
    pub offset: usize,
    pub limit: usize,
}

/// One page of questions plus the total count matching the filter
#[derive(Debug, Clone)]
pub struct QuestionPage {
    pub items: Vec<Question>,
    pub total: u64,
}

/// The external data collaborator, behind which all persistence lives
#[async_trait]
pub trait DataStore: Send + Sync {
    // --- Profiles ---

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()>;
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<Profile>>;
    async fn fetch_profile_by_username(&self, username: &str) -> StoreResult<Option<Profile>>;
    /// Most recently created first
    async fn list_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>>;
    /// Highest reputation first
    async fn top_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>>;
    async fn set_role(&self, user_id: &UserId, role: Role) -> StoreResult<()>;
    async fn count_profiles(&self) -> StoreResult<u64>;

    // --- Questions ---

    async fn insert_question(&self, question: &Question) -> StoreResult<()>;
    async fn fetch_question(&self, id: &QuestionId) -> StoreResult<Option<Question>>;
    async fn update_question(&self, id: &QuestionId, patch: &QuestionPatch) -> StoreResult<()>;
    /// Deleting a question also removes its answers and their votes
    async fn delete_question(&self, id: &QuestionId) -> StoreResult<()>;
    async fn bump_view_count(&self, id: &QuestionId) -> StoreResult<()>;
    async fn count_questions(&self) -> StoreResult<u64>;
    async fn count_questions_since(&self, since: Timestamp) -> StoreResult<u64>;
    async fn query_questions(&self, query: &QuestionQuery) -> StoreResult<QuestionPage>;
    async fn questions_by_author(&self, author: &UserId) -> StoreResult<Vec<Question>>;
    async fn recent_questions(&self, limit: usize) -> StoreResult<Vec<Question>>;

    // --- Answers ---

    /// Inserting an answer bumps the question's answer_count
    async fn insert_answer(&self, answer: &Answer) -> StoreResult<()>;
    async fn fetch_answer(&self, id: &AnswerId) -> StoreResult<Option<Answer>>;
    /// Accepted answers first, then by vote count descending
    async fn answers_for_question(&self, question_id: &QuestionId) -> StoreResult<Vec<Answer>>;
    /// Deleting an answer decrements the question's answer_count
    async fn delete_answer(&self, id: &AnswerId) -> StoreResult<()>;
    async fn set_accepted(&self, id: &AnswerId, accepted: bool) -> StoreResult<()>;
    /// Clear is_accepted on every answer of the question
    async fn clear_accepted(&self, question_id: &QuestionId) -> StoreResult<()>;
    async fn count_answers(&self) -> StoreResult<u64>;
    async fn answers_by_author(&self, author: &UserId) -> StoreResult<Vec<Answer>>;
    async fn recent_answers(&self, limit: usize) -> StoreResult<Vec<Answer>>;

    // --- Votes ---

    async fn find_vote(&self, target: &VoteTarget, user_id: &UserId) -> StoreResult<Option<Vote>>;
    /// All of the user's votes among the given targets, for listing annotation
    async fn find_votes_for_user(
        &self,
        user_id: &UserId,
        targets: &[VoteTarget],
    ) -> StoreResult<Vec<Vote>>;
    async fn create_vote(&self, vote: &Vote) -> StoreResult<()>;
    async fn update_vote(
        &self,
        target: &VoteTarget,
        user_id: &UserId,
        direction: VoteDirection,
    ) -> StoreResult<()>;
    async fn delete_vote(&self, target: &VoteTarget, user_id: &UserId) -> StoreResult<()>;
    async fn set_vote_count(&self, target: &VoteTarget, value: i64) -> StoreResult<()>;

    // --- Badges ---

    async fn insert_badge(&self, badge: &Badge) -> StoreResult<()>;
    async fn list_badges(&self) -> StoreResult<Vec<Badge>>;
    async fn award_badge(&self, award: &BadgeAward) -> StoreResult<()>;
    async fn badges_for_user(&self, user_id: &UserId) -> StoreResult<Vec<(BadgeAward, Badge)>>;

    // --- Announcements ---

    async fn insert_announcement(&self, announcement: &Announcement) -> StoreResult<()>;
    async fn list_announcements(&self, active_only: bool) -> StoreResult<Vec<Announcement>>;
    async fn set_announcement_active(
        &self,
        id: &AnnouncementId,
        active: bool,
    ) -> StoreResult<()>;
    async fn delete_announcement(&self, id: &AnnouncementId) -> StoreResult<()>;

    // --- Notifications ---

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;
    /// Most recent first
    async fn notifications_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: &NotificationId) -> StoreResult<()>;
    async fn mark_all_notifications_read(&self, user_id: &UserId) -> StoreResult<()>;
}
