//! Session store: the current authenticated identity
//!
//! Holds the identity produced by the auth collaborator and hands it to
//! every component that needs one. Passed around explicitly as an
//! `Arc<SessionStore>` - never ambient global state. Initialized empty
//! at startup, updated on auth-state-change events, cleared on logout.

use crate::core_store::model::Identity;
use tokio::sync::watch;

/// Holds the current identity and notifies subscribers when it changes
pub struct SessionStore {
    tx: watch::Sender<Option<Identity>>,
    // Hold a receiver so the watch channel never reports zero receivers;
    // otherwise `tx.send` returns early without storing the value.
    _rx: watch::Receiver<Option<Identity>>,
}

impl SessionStore {
    /// New store with no authenticated identity
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        SessionStore { tx, _rx: rx }
    }

    /// Record a successful sign-in (or a refreshed profile for the same user)
    pub fn sign_in(&self, identity: Identity) {
        let _ = self.tx.send(Some(identity));
    }

    /// Clear the identity on logout
    pub fn sign_out(&self) {
        let _ = self.tx.send(None);
    }

    /// The current identity, if any
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribe to auth-state changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new()
    }
}
