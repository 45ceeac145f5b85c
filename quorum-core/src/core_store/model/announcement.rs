/*
    announcement.rs - Platform announcement model

    Announcements are posted from the admin dashboard and shown on the
    public site while is_active holds. Deactivating hides without
    deleting.
*/

use super::types::{AnnouncementId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A site-wide announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub body: String,
    /// Whether the announcement is currently shown
    pub is_active: bool,
    pub author_id: UserId,
    pub created_at: Timestamp,
}

impl Announcement {
    /// New announcements start active
    pub fn new(title: String, body: String, author_id: UserId) -> Self {
        Announcement {
            id: AnnouncementId::generate(),
            title,
            body,
            is_active: true,
            author_id,
            created_at: Timestamp::now(),
        }
    }
}
