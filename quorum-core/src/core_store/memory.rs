/*
    memory.rs - In-memory DataStore

    Reference implementation backed by RwLock'd maps. Used by tests and
    by anything that wants a store without a database on disk. Behavior
    must match the sqlite store exactly; the conformance tests in
    core_store/tests.rs run both.

    The op counter records every trait call, which lets tests assert
    that a rejected operation touched the store zero times.
*/

use super::errors::{StoreError, StoreResult};
use super::model::{
    Announcement, AnnouncementId, Answer, AnswerId, Badge, BadgeAward, BadgeId, Notification,
    NotificationId, Profile, Question, QuestionId, QuestionPatch, Role, Timestamp, UserId, Vote,
    VoteDirection, VoteTarget,
};
use super::traits::{DataStore, QuestionPage, QuestionQuery, SortKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryInner {
    profiles: HashMap<UserId, Profile>,
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<AnswerId, Answer>,
    votes: HashMap<(VoteTarget, UserId), Vote>,
    badges: HashMap<BadgeId, Badge>,
    awards: Vec<BadgeAward>,
    announcements: HashMap<AnnouncementId, Announcement>,
    notifications: HashMap<NotificationId, Notification>,
}

/// In-memory store, cheap to construct and fully isolated per instance
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    ops: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations performed since construction
    pub fn op_count(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    fn record_op(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }
}

fn matches_search(question: &Question, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    question.title.to_lowercase().contains(&needle)
        || question.body.to_lowercase().contains(&needle)
        || question
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

#[async_trait]
impl DataStore for MemoryStore {
    // --- Profiles ---

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        if inner
            .profiles
            .values()
            .any(|p| p.username == profile.username)
        {
            return Err(StoreError::Conflict(format!(
                "username taken: {}",
                profile.username
            )));
        }
        inner.profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<Profile>> {
        self.record_op();
        Ok(self.inner.read().await.profiles.get(user_id).cloned())
    }

    async fn fetch_profile_by_username(&self, username: &str) -> StoreResult<Option<Profile>> {
        self.record_op();
        Ok(self
            .inner
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn list_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut profiles: Vec<Profile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        profiles.truncate(limit);
        Ok(profiles)
    }

    async fn top_profiles(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut profiles: Vec<Profile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.reputation.cmp(&a.reputation));
        profiles.truncate(limit);
        Ok(profiles)
    }

    async fn set_role(&self, user_id: &UserId, role: Role) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", user_id)))?;
        profile.role = role;
        profile.updated_at = Timestamp::now();
        Ok(())
    }

    async fn count_profiles(&self) -> StoreResult<u64> {
        self.record_op();
        Ok(self.inner.read().await.profiles.len() as u64)
    }

    // --- Questions ---

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        self.record_op();
        self.inner
            .write()
            .await
            .questions
            .insert(question.id.clone(), question.clone());
        Ok(())
    }

    async fn fetch_question(&self, id: &QuestionId) -> StoreResult<Option<Question>> {
        self.record_op();
        Ok(self.inner.read().await.questions.get(id).cloned())
    }

    async fn update_question(&self, id: &QuestionId, patch: &QuestionPatch) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let question = inner
            .questions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
        question.title = patch.title.clone();
        question.body = patch.body.clone();
        question.tags = patch.tags.clone();
        question.updated_at = Timestamp::now();
        Ok(())
    }

    async fn delete_question(&self, id: &QuestionId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        if inner.questions.remove(id).is_none() {
            return Err(StoreError::NotFound(format!("question {}", id)));
        }
        let orphaned: Vec<AnswerId> = inner
            .answers
            .values()
            .filter(|a| &a.question_id == id)
            .map(|a| a.id.clone())
            .collect();
        for answer_id in &orphaned {
            inner.answers.remove(answer_id);
        }
        inner.votes.retain(|(target, _), _| match target {
            VoteTarget::Question(qid) => qid != id,
            VoteTarget::Answer(aid) => !orphaned.contains(aid),
        });
        Ok(())
    }

    async fn bump_view_count(&self, id: &QuestionId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let question = inner
            .questions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
        question.view_count += 1;
        Ok(())
    }

    async fn count_questions(&self) -> StoreResult<u64> {
        self.record_op();
        Ok(self.inner.read().await.questions.len() as u64)
    }

    async fn count_questions_since(&self, since: Timestamp) -> StoreResult<u64> {
        self.record_op();
        Ok(self
            .inner
            .read()
            .await
            .questions
            .values()
            .filter(|q| q.created_at >= since)
            .count() as u64)
    }

    async fn query_questions(&self, query: &QuestionQuery) -> StoreResult<QuestionPage> {
        self.record_op();
        let inner = self.inner.read().await;

        let mut matching: Vec<Question> = inner
            .questions
            .values()
            .filter(|q| match &query.search {
                Some(needle) => matches_search(q, needle),
                None => true,
            })
            .filter(|q| match query.sort {
                SortKey::Unanswered => q.is_unanswered(),
                _ => true,
            })
            .cloned()
            .collect();

        match query.sort {
            SortKey::Newest | SortKey::Unanswered => {
                matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            SortKey::MostVoted => {
                matching.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
            }
        }

        let total = matching.len() as u64;
        let items: Vec<Question> = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(QuestionPage { items, total })
    }

    async fn questions_by_author(&self, author: &UserId) -> StoreResult<Vec<Question>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut questions: Vec<Question> = inner
            .questions
            .values()
            .filter(|q| &q.author_id == author)
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(questions)
    }

    async fn recent_questions(&self, limit: usize) -> StoreResult<Vec<Question>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut questions: Vec<Question> = inner.questions.values().cloned().collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        questions.truncate(limit);
        Ok(questions)
    }

    // --- Answers ---

    async fn insert_answer(&self, answer: &Answer) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let question = inner
            .questions
            .get_mut(&answer.question_id)
            .ok_or_else(|| StoreError::NotFound(format!("question {}", answer.question_id)))?;
        question.answer_count += 1;
        inner.answers.insert(answer.id.clone(), answer.clone());
        Ok(())
    }

    async fn fetch_answer(&self, id: &AnswerId) -> StoreResult<Option<Answer>> {
        self.record_op();
        Ok(self.inner.read().await.answers.get(id).cloned())
    }

    async fn answers_for_question(&self, question_id: &QuestionId) -> StoreResult<Vec<Answer>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut answers: Vec<Answer> = inner
            .answers
            .values()
            .filter(|a| &a.question_id == question_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| {
            b.is_accepted
                .cmp(&a.is_accepted)
                .then(b.vote_count.cmp(&a.vote_count))
        });
        Ok(answers)
    }

    async fn delete_answer(&self, id: &AnswerId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let answer = inner
            .answers
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("answer {}", id)))?;
        if let Some(question) = inner.questions.get_mut(&answer.question_id) {
            question.answer_count = question.answer_count.saturating_sub(1);
        }
        inner
            .votes
            .retain(|(target, _), _| !matches!(target, VoteTarget::Answer(aid) if aid == id));
        Ok(())
    }

    async fn set_accepted(&self, id: &AnswerId, accepted: bool) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let answer = inner
            .answers
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("answer {}", id)))?;
        answer.is_accepted = accepted;
        Ok(())
    }

    async fn clear_accepted(&self, question_id: &QuestionId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        for answer in inner.answers.values_mut() {
            if &answer.question_id == question_id {
                answer.is_accepted = false;
            }
        }
        Ok(())
    }

    async fn count_answers(&self) -> StoreResult<u64> {
        self.record_op();
        Ok(self.inner.read().await.answers.len() as u64)
    }

    async fn answers_by_author(&self, author: &UserId) -> StoreResult<Vec<Answer>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut answers: Vec<Answer> = inner
            .answers
            .values()
            .filter(|a| &a.author_id == author)
            .cloned()
            .collect();
        answers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(answers)
    }

    async fn recent_answers(&self, limit: usize) -> StoreResult<Vec<Answer>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut answers: Vec<Answer> = inner.answers.values().cloned().collect();
        answers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        answers.truncate(limit);
        Ok(answers)
    }

    // --- Votes ---

    async fn find_vote(&self, target: &VoteTarget, user_id: &UserId) -> StoreResult<Option<Vote>> {
        self.record_op();
        Ok(self
            .inner
            .read()
            .await
            .votes
            .get(&(target.clone(), user_id.clone()))
            .cloned())
    }

    async fn find_votes_for_user(
        &self,
        user_id: &UserId,
        targets: &[VoteTarget],
    ) -> StoreResult<Vec<Vote>> {
        self.record_op();
        let inner = self.inner.read().await;
        Ok(targets
            .iter()
            .filter_map(|target| inner.votes.get(&(target.clone(), user_id.clone())))
            .cloned()
            .collect())
    }

    async fn create_vote(&self, vote: &Vote) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let key = (vote.target.clone(), vote.user_id.clone());
        if inner.votes.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "vote already exists for {} by {}",
                vote.target, vote.user_id
            )));
        }
        inner.votes.insert(key, vote.clone());
        Ok(())
    }

    async fn update_vote(
        &self,
        target: &VoteTarget,
        user_id: &UserId,
        direction: VoteDirection,
    ) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let vote = inner
            .votes
            .get_mut(&(target.clone(), user_id.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("vote on {} by {}", target, user_id)))?;
        vote.direction = direction;
        Ok(())
    }

    async fn delete_vote(&self, target: &VoteTarget, user_id: &UserId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        inner
            .votes
            .remove(&(target.clone(), user_id.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("vote on {} by {}", target, user_id)))?;
        Ok(())
    }

    async fn set_vote_count(&self, target: &VoteTarget, value: i64) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        match target {
            VoteTarget::Question(id) => {
                let question = inner
                    .questions
                    .get_mut(id)
                    .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
                question.vote_count = value;
            }
            VoteTarget::Answer(id) => {
                let answer = inner
                    .answers
                    .get_mut(id)
                    .ok_or_else(|| StoreError::NotFound(format!("answer {}", id)))?;
                answer.vote_count = value;
            }
        }
        Ok(())
    }

    // --- Badges ---

    async fn insert_badge(&self, badge: &Badge) -> StoreResult<()> {
        self.record_op();
        self.inner
            .write()
            .await
            .badges
            .insert(badge.id.clone(), badge.clone());
        Ok(())
    }

    async fn list_badges(&self) -> StoreResult<Vec<Badge>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut badges: Vec<Badge> = inner.badges.values().cloned().collect();
        badges.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(badges)
    }

    async fn award_badge(&self, award: &BadgeAward) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        if !inner.badges.contains_key(&award.badge_id) {
            return Err(StoreError::NotFound(format!("badge {}", award.badge_id)));
        }
        if inner
            .awards
            .iter()
            .any(|a| a.user_id == award.user_id && a.badge_id == award.badge_id)
        {
            return Err(StoreError::Conflict(format!(
                "badge {} already awarded to {}",
                award.badge_id, award.user_id
            )));
        }
        inner.awards.push(award.clone());
        Ok(())
    }

    async fn badges_for_user(&self, user_id: &UserId) -> StoreResult<Vec<(BadgeAward, Badge)>> {
        self.record_op();
        let inner = self.inner.read().await;
        Ok(inner
            .awards
            .iter()
            .filter(|a| &a.user_id == user_id)
            .filter_map(|a| {
                inner
                    .badges
                    .get(&a.badge_id)
                    .map(|b| (a.clone(), b.clone()))
            })
            .collect())
    }

    // --- Announcements ---

    async fn insert_announcement(&self, announcement: &Announcement) -> StoreResult<()> {
        self.record_op();
        self.inner
            .write()
            .await
            .announcements
            .insert(announcement.id.clone(), announcement.clone());
        Ok(())
    }

    async fn list_announcements(&self, active_only: bool) -> StoreResult<Vec<Announcement>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut announcements: Vec<Announcement> = inner
            .announcements
            .values()
            .filter(|a| !active_only || a.is_active)
            .cloned()
            .collect();
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }

    async fn set_announcement_active(
        &self,
        id: &AnnouncementId,
        active: bool,
    ) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let announcement = inner
            .announcements
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("announcement {}", id)))?;
        announcement.is_active = active;
        Ok(())
    }

    async fn delete_announcement(&self, id: &AnnouncementId) -> StoreResult<()> {
        self.record_op();
        self.inner
            .write()
            .await
            .announcements
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("announcement {}", id)))?;
        Ok(())
    }

    // --- Notifications ---

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.record_op();
        self.inner
            .write()
            .await
            .notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> StoreResult<Vec<Notification>> {
        self.record_op();
        let inner = self.inner.read().await;
        let mut notifications: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        let notification = inner
            .notifications
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("notification {}", id)))?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: &UserId) -> StoreResult<()> {
        self.record_op();
        let mut inner = self.inner.write().await;
        for notification in inner.notifications.values_mut() {
            if &notification.user_id == user_id {
                notification.is_read = true;
            }
        }
        Ok(())
    }
}
