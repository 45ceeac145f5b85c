/*
    badge.rs - Badge catalog and awards

    Badges live in a small catalog; an award links a user to a catalog
    entry. Awarding logic (reputation thresholds and the like) runs
    outside this core; here badges are only stored and listed.
*/

use super::types::{BadgeId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Badge tier, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTier {
    Bronze,
    Silver,
    Gold,
}

impl BadgeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTier::Bronze => "bronze",
            BadgeTier::Silver => "silver",
            BadgeTier::Gold => "gold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bronze" => Some(BadgeTier::Bronze),
            "silver" => Some(BadgeTier::Silver),
            "gold" => Some(BadgeTier::Gold),
            _ => None,
        }
    }
}

impl fmt::Display for BadgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A badge definition in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    /// Short glyph shown next to the name
    pub icon: String,
    pub tier: BadgeTier,
}

impl Badge {
    pub fn new(name: String, description: String, icon: String, tier: BadgeTier) -> Self {
        Badge {
            id: BadgeId::generate(),
            name,
            description,
            icon,
            tier,
        }
    }

    /// The built-in starter catalog, used when seeding a fresh store
    pub fn starter_catalog() -> Vec<Badge> {
        vec![
            Badge::new(
                "Curious".to_string(),
                "Asked a first question".to_string(),
                "?".to_string(),
                BadgeTier::Bronze,
            ),
            Badge::new(
                "Helper".to_string(),
                "Posted a first answer".to_string(),
                "!".to_string(),
                BadgeTier::Bronze,
            ),
            Badge::new(
                "Scholar".to_string(),
                "Accepted an answer to a question".to_string(),
                "*".to_string(),
                BadgeTier::Silver,
            ),
            Badge::new(
                "Expert".to_string(),
                "Earned 1000 reputation".to_string(),
                "+".to_string(),
                BadgeTier::Gold,
            ),
        ]
    }
}

/// A badge awarded to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub awarded_at: Timestamp,
}

impl BadgeAward {
    pub fn new(user_id: UserId, badge_id: BadgeId) -> Self {
        BadgeAward {
            user_id,
            badge_id,
            awarded_at: Timestamp::now(),
        }
    }
}
