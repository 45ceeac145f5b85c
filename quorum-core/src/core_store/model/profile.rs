/*
    profile.rs - User profile model

    The profile is the public face of an account: username, avatar, role
    and reputation. It is created by the auth collaborator on signup and
    mutated by moderation (role) and reputation-awarding side effects.
*/

use super::types::{Role, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A user's public profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Account this profile belongs to
    pub user_id: UserId,

    /// Display name, unique across the platform
    pub username: String,

    /// Optional avatar image URL
    pub avatar_url: Option<String>,

    /// Account role (user / admin / banned)
    pub role: Role,

    /// Non-negative reputation score; awarded elsewhere, only displayed here
    pub reputation: u64,

    /// When the account was created
    pub created_at: Timestamp,

    /// Last profile update
    pub updated_at: Timestamp,
}

impl Profile {
    /// Create a fresh profile for a new account
    pub fn new(user_id: UserId, username: String) -> Self {
        let now = Timestamp::now();
        Profile {
            user_id,
            username,
            avatar_url: None,
            role: Role::User,
            reputation: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The authenticated-identity view of this profile
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            role: self.role,
            reputation: self.reputation,
        }
    }
}

/// The current authenticated identity, as held by the session store
///
/// A trimmed view of [`Profile`]: everything the rest of the system needs
/// to make authorization decisions or render attribution, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub reputation: u64,
}
