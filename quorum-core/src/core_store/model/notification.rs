/*
    notification.rs - Per-user notification model
*/

use super::types::{NotificationId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A notification addressed to a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(user_id: UserId, title: String, body: String) -> Self {
        Notification {
            id: NotificationId::generate(),
            user_id,
            title,
            body,
            is_read: false,
            created_at: Timestamp::now(),
        }
    }
}
