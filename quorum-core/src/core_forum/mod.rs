/*
    core_forum - Question and answer workflows

    The write-side of the public site: asking, answering, editing,
    deleting and accepting. Every operation checks the primary identity
    gate before touching the store; read paths live in core_query.
*/

use crate::core_auth::errors::AuthError;
use crate::core_auth::{policy, SessionStore};
use crate::core_store::changes::{ChangeFeed, ChangeTopic};
use crate::core_store::errors::StoreError;
use crate::core_store::model::{
    Answer, AnswerId, Notification, Question, QuestionId, QuestionPatch,
};
use crate::core_store::traits::DataStore;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by forum operations
#[derive(Debug, Error)]
pub enum ForumError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    Validation(String),
}

/// Write-side service for questions and answers
pub struct ForumService<S: DataStore> {
    store: Arc<S>,
    session: Arc<SessionStore>,
    changes: Arc<ChangeFeed>,
}

impl<S: DataStore> ForumService<S> {
    pub fn new(store: Arc<S>, session: Arc<SessionStore>, changes: Arc<ChangeFeed>) -> Self {
        ForumService {
            store,
            session,
            changes,
        }
    }

    /// Post a new question
    pub async fn ask_question(
        &self,
        title: &str,
        body: &str,
        tags: Vec<String>,
    ) -> Result<Question, ForumError> {
        let identity = policy::require_identity(&self.session)?;
        policy::ensure_not_banned(&identity)?;

        let title = title.trim();
        let body = body.trim();
        if title.is_empty() {
            return Err(ForumError::Validation("title must not be empty".to_string()));
        }
        if body.is_empty() {
            return Err(ForumError::Validation("body must not be empty".to_string()));
        }

        let question = Question::new(
            title.to_string(),
            body.to_string(),
            tags,
            identity.user_id.clone(),
        );
        self.store.insert_question(&question).await?;

        counter!("quorum.questions.asked").increment(1);
        debug!(question = %question.id, author = %identity.user_id, "question posted");
        self.changes.publish(ChangeTopic::Questions);

        Ok(question)
    }

    /// Fetch a question for display, bumping its view counter.
    /// The returned question already reflects the bumped count.
    pub async fn question_detail(&self, id: &QuestionId) -> Result<Question, ForumError> {
        let mut question = self
            .store
            .fetch_question(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;

        self.store.bump_view_count(id).await?;
        question.view_count += 1;

        Ok(question)
    }

    /// Edit a question's title, body or tags (author or admin)
    pub async fn edit_question(
        &self,
        id: &QuestionId,
        patch: QuestionPatch,
    ) -> Result<(), ForumError> {
        let identity = policy::require_identity(&self.session)?;
        policy::ensure_not_banned(&identity)?;

        let question = self
            .store
            .fetch_question(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
        policy::ensure_can_modify_question(&identity, &question)?;

        if patch.title.trim().is_empty() {
            return Err(ForumError::Validation("title must not be empty".to_string()));
        }

        self.store.update_question(id, &patch).await?;
        self.changes.publish(ChangeTopic::Questions);
        Ok(())
    }

    /// Delete a question and everything attached to it (author or admin)
    pub async fn delete_question(&self, id: &QuestionId) -> Result<(), ForumError> {
        let identity = policy::require_identity(&self.session)?;

        let question = self
            .store
            .fetch_question(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))?;
        policy::ensure_can_modify_question(&identity, &question)?;

        self.store.delete_question(id).await?;
        debug!(question = %id, by = %identity.user_id, "question deleted");
        self.changes.publish(ChangeTopic::Questions);
        Ok(())
    }

    /// Post an answer; notifies the question author
    pub async fn post_answer(
        &self,
        question_id: &QuestionId,
        body: &str,
    ) -> Result<Answer, ForumError> {
        let identity = policy::require_identity(&self.session)?;
        policy::ensure_not_banned(&identity)?;

        let body = body.trim();
        if body.is_empty() {
            return Err(ForumError::Validation("answer must not be empty".to_string()));
        }

        let question = self
            .store
            .fetch_question(question_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("question {}", question_id)))?;

        let answer = Answer::new(
            question_id.clone(),
            identity.user_id.clone(),
            body.to_string(),
        );
        self.store.insert_answer(&answer).await?;

        counter!("quorum.answers.posted").increment(1);
        self.changes
            .publish(ChangeTopic::Answers(question_id.clone()));

        // Answering your own question makes no notification
        if question.author_id != identity.user_id {
            let notification = Notification::new(
                question.author_id.clone(),
                "New answer".to_string(),
                format!("{} answered \"{}\"", identity.username, question.title),
            );
            // Notification failure never fails the answer itself
            if let Err(e) = self.store.insert_notification(&notification).await {
                warn!("failed to record answer notification: {}", e);
            } else {
                self.changes
                    .publish(ChangeTopic::Notifications(question.author_id));
            }
        }

        Ok(answer)
    }

    /// Delete an answer (author or admin)
    pub async fn delete_answer(&self, id: &AnswerId) -> Result<(), ForumError> {
        let identity = policy::require_identity(&self.session)?;

        let answer = self
            .store
            .fetch_answer(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("answer {}", id)))?;
        policy::ensure_can_delete_answer(&identity, &answer)?;

        self.store.delete_answer(id).await?;
        self.changes
            .publish(ChangeTopic::Answers(answer.question_id));
        Ok(())
    }

    /// Toggle acceptance of an answer. Only the question author may do
    /// this; accepting first un-accepts any other answer so at most one
    /// is accepted per question. Returns the new accepted state.
    pub async fn accept_answer(&self, answer_id: &AnswerId) -> Result<bool, ForumError> {
        let identity = policy::require_identity(&self.session)?;

        let answer = self
            .store
            .fetch_answer(answer_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("answer {}", answer_id)))?;
        let question = self
            .store
            .fetch_question(&answer.question_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("question {}", answer.question_id)))?;
        policy::ensure_question_author(&identity, &question)?;

        let accepting = !answer.is_accepted;
        if accepting {
            self.store.clear_accepted(&answer.question_id).await?;
        }
        self.store.set_accepted(answer_id, accepting).await?;

        self.changes
            .publish(ChangeTopic::Answers(answer.question_id));
        Ok(accepting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_store::memory::MemoryStore;
    use crate::core_store::model::{Profile, Role, UserId};
    use crate::core_store::traits::DataStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        session: Arc<SessionStore>,
        forum: ForumService<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new());
        let changes = Arc::new(ChangeFeed::default());
        let forum = ForumService::new(store.clone(), session.clone(), changes);
        Fixture {
            store,
            session,
            forum,
        }
    }

    async fn sign_up_and_in(fx: &Fixture, username: &str, role: Role) -> Profile {
        let mut profile = Profile::new(UserId::generate(), username.to_string());
        profile.role = role;
        fx.store.insert_profile(&profile).await.unwrap();
        fx.session.sign_in(profile.identity());
        profile
    }

    #[tokio::test]
    async fn test_guest_cannot_ask() {
        let fx = fixture();
        let err = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::Auth(AuthError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let fx = fixture();
        sign_up_and_in(&fx, "alice", Role::User).await;
        let err = fx
            .forum
            .ask_question("   ", "body", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::Validation(_)));
    }

    #[tokio::test]
    async fn test_detail_fetch_bumps_views() {
        let fx = fixture();
        sign_up_and_in(&fx, "alice", Role::User).await;
        let question = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap();

        let detail = fx.forum.question_detail(&question.id).await.unwrap();
        assert_eq!(detail.view_count, 1);

        let detail = fx.forum.question_detail(&question.id).await.unwrap();
        assert_eq!(detail.view_count, 2);
    }

    #[tokio::test]
    async fn test_delete_requires_author_or_admin() {
        let fx = fixture();
        sign_up_and_in(&fx, "author", Role::User).await;
        let question = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap();

        // A different plain user may not delete
        sign_up_and_in(&fx, "stranger", Role::User).await;
        let err = fx.forum.delete_question(&question.id).await.unwrap_err();
        assert!(matches!(err, ForumError::Auth(AuthError::AuthzDenied(_))));

        // An admin may
        sign_up_and_in(&fx, "moderator", Role::Admin).await;
        fx.forum.delete_question(&question.id).await.unwrap();
        assert!(fx
            .store
            .fetch_question(&question.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_answer_notifies_question_author() {
        let fx = fixture();
        let author = sign_up_and_in(&fx, "author", Role::User).await;
        let question = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap();

        sign_up_and_in(&fx, "helper", Role::User).await;
        fx.forum
            .post_answer(&question.id, "an answer")
            .await
            .unwrap();

        let notifications = fx
            .store
            .notifications_for_user(&author.user_id, 10)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(!notifications[0].is_read);
    }

    #[tokio::test]
    async fn test_answering_own_question_makes_no_notification() {
        let fx = fixture();
        let author = sign_up_and_in(&fx, "author", Role::User).await;
        let question = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap();
        fx.forum.post_answer(&question.id, "self").await.unwrap();

        let notifications = fx
            .store
            .notifications_for_user(&author.user_id, 10)
            .await
            .unwrap();
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn test_accept_is_exclusive_and_toggles() {
        let fx = fixture();
        sign_up_and_in(&fx, "author", Role::User).await;
        let question = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap();
        let first = fx.forum.post_answer(&question.id, "first").await.unwrap();
        let second = fx.forum.post_answer(&question.id, "second").await.unwrap();

        assert!(fx.forum.accept_answer(&first.id).await.unwrap());
        assert!(fx.forum.accept_answer(&second.id).await.unwrap());

        // Accepting the second cleared the first
        let answers = fx.store.answers_for_question(&question.id).await.unwrap();
        let accepted: Vec<_> = answers.iter().filter(|a| a.is_accepted).collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, second.id);

        // Toggling off un-accepts
        assert!(!fx.forum.accept_answer(&second.id).await.unwrap());
        let answers = fx.store.answers_for_question(&question.id).await.unwrap();
        assert!(answers.iter().all(|a| !a.is_accepted));
    }

    #[tokio::test]
    async fn test_only_question_author_accepts() {
        let fx = fixture();
        sign_up_and_in(&fx, "author", Role::User).await;
        let question = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap();
        let answer = fx.forum.post_answer(&question.id, "answer").await.unwrap();

        sign_up_and_in(&fx, "other", Role::User).await;
        let err = fx.forum.accept_answer(&answer.id).await.unwrap_err();
        assert!(matches!(err, ForumError::Auth(AuthError::AuthzDenied(_))));
    }

    #[tokio::test]
    async fn test_banned_user_cannot_post() {
        let fx = fixture();
        sign_up_and_in(&fx, "banned", Role::Banned).await;
        let err = fx
            .forum
            .ask_question("title", "body", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::Auth(AuthError::AuthzDenied(_))));
    }
}
