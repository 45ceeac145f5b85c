/*
    core_notify - Per-user notification feed

    Read/mark operations for the signed-in user's notifications. New
    notifications are written by the services that cause them (e.g. the
    forum service on a new answer); this module only consumes them.
*/

use crate::core_auth::errors::AuthError;
use crate::core_auth::{policy, SessionStore};
use crate::core_store::changes::{ChangeFeed, ChangeTopic};
use crate::core_store::errors::StoreError;
use crate::core_store::model::{Notification, NotificationId};
use crate::core_store::traits::DataStore;
use std::sync::Arc;
use thiserror::Error;

/// Default number of notifications shown in the dropdown
const FEED_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The signed-in user's notification feed
pub struct NotificationFeed<S: DataStore> {
    store: Arc<S>,
    session: Arc<SessionStore>,
    changes: Arc<ChangeFeed>,
}

impl<S: DataStore> NotificationFeed<S> {
    pub fn new(store: Arc<S>, session: Arc<SessionStore>, changes: Arc<ChangeFeed>) -> Self {
        NotificationFeed {
            store,
            session,
            changes,
        }
    }

    /// Most recent notifications for the session user
    pub async fn list(&self) -> Result<Vec<Notification>, NotifyError> {
        let identity = policy::require_identity(&self.session)?;
        Ok(self
            .store
            .notifications_for_user(&identity.user_id, FEED_LIMIT)
            .await?)
    }

    pub async fn unread_count(&self) -> Result<usize, NotifyError> {
        Ok(self.list().await?.iter().filter(|n| !n.is_read).count())
    }

    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), NotifyError> {
        let identity = policy::require_identity(&self.session)?;
        self.store.mark_notification_read(id).await?;
        self.changes
            .publish(ChangeTopic::Notifications(identity.user_id));
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), NotifyError> {
        let identity = policy::require_identity(&self.session)?;
        self.store
            .mark_all_notifications_read(&identity.user_id)
            .await?;
        self.changes
            .publish(ChangeTopic::Notifications(identity.user_id));
        Ok(())
    }
}
