/*
    changes.rs - Change notification feed

    Models the backend's "something changed, re-fetch" stream. Events
    carry a topic and nothing else: consumers re-query, they never apply
    payloads. Delivery is best-effort broadcast; a lagging subscriber
    misses events and simply re-queries on the next one.
*/

use super::model::{QuestionId, Timestamp, UserId};
use tokio::sync::broadcast;

/// What changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTopic {
    /// The question listing (ask/edit/delete)
    Questions,
    /// Answers of one question
    Answers(QuestionId),
    /// Any vote or counter change
    Votes,
    /// The announcement list
    Announcements,
    /// One user's notifications
    Notifications(UserId),
}

/// A single change event
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub topic: ChangeTopic,
    pub at: Timestamp,
}

/// Fan-out hub for change events
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        ChangeFeed { tx }
    }

    /// Publish a change; silently dropped when nobody is subscribed
    pub fn publish(&self, topic: ChangeTopic) {
        let _ = self.tx.send(ChangeEvent {
            topic,
            at: Timestamp::now(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(64)
    }
}
