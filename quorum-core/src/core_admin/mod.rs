/*
    core_admin - Moderation dashboard operations

    Every operation here sits behind the secondary admin-session gate:
    the dashboard is its own entry point, reached without the identity
    system, so the gate check happens per call and an expired flag turns
    into SessionRequired rather than a crash.
*/

use crate::core_auth::{AdminGate, AdminSessionState};
use crate::core_store::changes::{ChangeFeed, ChangeTopic};
use crate::core_store::errors::StoreError;
use crate::core_store::model::{
    Announcement, AnnouncementId, Answer, AnswerId, Profile, Question, QuestionId, QuestionPatch,
    Role, Timestamp, UserId,
};
use crate::core_store::traits::DataStore;
use chrono::{TimeZone, Utc};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// How many rows the dashboard lists per panel
const DASHBOARD_LIST_LIMIT: usize = 50;

/// Errors surfaced by dashboard operations
#[derive(Debug, Error)]
pub enum AdminError {
    /// The admin-session flag is absent or expired
    #[error("Admin session required")]
    SessionRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_questions: u64,
    pub total_answers: u64,
    pub today_questions: u64,
}

/// Moderation service, gated by the admin session flag
pub struct AdminService<S: DataStore> {
    store: Arc<S>,
    gate: Arc<AdminGate>,
    changes: Arc<ChangeFeed>,
}

impl<S: DataStore> AdminService<S> {
    pub fn new(store: Arc<S>, gate: Arc<AdminGate>, changes: Arc<ChangeFeed>) -> Self {
        AdminService {
            store,
            gate,
            changes,
        }
    }

    fn ensure_session(&self) -> Result<(), AdminError> {
        match self.gate.check() {
            AdminSessionState::Valid => Ok(()),
            AdminSessionState::Absent | AdminSessionState::Expired => {
                Err(AdminError::SessionRequired)
            }
        }
    }

    /// Totals for the dashboard header cards
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AdminError> {
        self.ensure_session()?;

        let midnight = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap();
        let start_of_today =
            Timestamp::from_millis(Utc.from_utc_datetime(&midnight).timestamp_millis() as u64);

        Ok(DashboardStats {
            total_users: self.store.count_profiles().await?,
            total_questions: self.store.count_questions().await?,
            total_answers: self.store.count_answers().await?,
            today_questions: self.store.count_questions_since(start_of_today).await?,
        })
    }

    /// Most recently registered users
    pub async fn list_users(&self) -> Result<Vec<Profile>, AdminError> {
        self.ensure_session()?;
        Ok(self.store.list_profiles(DASHBOARD_LIST_LIMIT).await?)
    }

    /// Most recent questions
    pub async fn list_questions(&self) -> Result<Vec<Question>, AdminError> {
        self.ensure_session()?;
        Ok(self.store.recent_questions(DASHBOARD_LIST_LIMIT).await?)
    }

    /// Most recent answers
    pub async fn list_answers(&self) -> Result<Vec<Answer>, AdminError> {
        self.ensure_session()?;
        Ok(self.store.recent_answers(DASHBOARD_LIST_LIMIT).await?)
    }

    pub async fn ban_user(&self, user_id: &UserId) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.set_role(user_id, Role::Banned).await?;
        counter!("quorum.admin.actions").increment(1);
        info!(user = %user_id, "user banned");
        Ok(())
    }

    pub async fn unban_user(&self, user_id: &UserId) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.set_role(user_id, Role::User).await?;
        counter!("quorum.admin.actions").increment(1);
        info!(user = %user_id, "user unbanned");
        Ok(())
    }

    pub async fn promote_admin(&self, user_id: &UserId) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.set_role(user_id, Role::Admin).await?;
        counter!("quorum.admin.actions").increment(1);
        info!(user = %user_id, "user promoted to admin");
        Ok(())
    }

    /// Moderation delete: no ownership check, the gate is the authority
    pub async fn delete_question(&self, id: &QuestionId) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.delete_question(id).await?;
        counter!("quorum.admin.actions").increment(1);
        self.changes.publish(ChangeTopic::Questions);
        Ok(())
    }

    pub async fn delete_answer(&self, id: &AnswerId) -> Result<(), AdminError> {
        self.ensure_session()?;
        let answer = self
            .store
            .fetch_answer(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("answer {}", id)))?;
        self.store.delete_answer(id).await?;
        counter!("quorum.admin.actions").increment(1);
        self.changes
            .publish(ChangeTopic::Answers(answer.question_id));
        Ok(())
    }

    pub async fn edit_question(
        &self,
        id: &QuestionId,
        patch: QuestionPatch,
    ) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.update_question(id, &patch).await?;
        self.changes.publish(ChangeTopic::Questions);
        Ok(())
    }

    /// Post a new announcement, active immediately
    pub async fn post_announcement(
        &self,
        author_id: &UserId,
        title: &str,
        body: &str,
    ) -> Result<Announcement, AdminError> {
        self.ensure_session()?;
        let announcement = Announcement::new(
            title.trim().to_string(),
            body.trim().to_string(),
            author_id.clone(),
        );
        self.store.insert_announcement(&announcement).await?;
        counter!("quorum.admin.actions").increment(1);
        self.changes.publish(ChangeTopic::Announcements);
        Ok(announcement)
    }

    /// Every announcement, active or not, for the dashboard list
    pub async fn list_announcements(&self) -> Result<Vec<Announcement>, AdminError> {
        self.ensure_session()?;
        Ok(self.store.list_announcements(false).await?)
    }

    pub async fn set_announcement_active(
        &self,
        id: &AnnouncementId,
        active: bool,
    ) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.set_announcement_active(id, active).await?;
        self.changes.publish(ChangeTopic::Announcements);
        Ok(())
    }

    pub async fn delete_announcement(&self, id: &AnnouncementId) -> Result<(), AdminError> {
        self.ensure_session()?;
        self.store.delete_announcement(id).await?;
        self.changes.publish(ChangeTopic::Announcements);
        Ok(())
    }
}
