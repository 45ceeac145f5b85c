/*
    model - Data models for the Q&A platform

    Plain serde-able structs shared by every store implementation and
    every service. No storage or policy logic lives here.
*/

pub mod announcement;
pub mod answer;
pub mod badge;
pub mod notification;
pub mod profile;
pub mod question;
pub mod types;
pub mod vote;

pub use announcement::Announcement;
pub use answer::Answer;
pub use badge::{Badge, BadgeAward, BadgeTier};
pub use notification::Notification;
pub use profile::{Identity, Profile};
pub use question::{Question, QuestionPatch};
pub use types::{
    AnnouncementId, AnswerId, BadgeId, NotificationId, QuestionId, Role, Timestamp, UserId,
};
pub use vote::{Vote, VoteDirection, VoteTarget};
