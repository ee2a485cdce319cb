//! Per-user conversation session storage.
//!
//! One [`Session`] per chat, holding the active dialog [`Flow`] and its
//! typed step data. A user's dialog is strictly sequential, so sessions are
//! read-modify-written as a whole; many independent chats run concurrently.

use std::{collections::HashMap, sync::Arc, time::Duration};

use common::DateTime;
use tokio::sync::RwLock;

use crate::domain::user;

use super::Flow;

/// Keyed store of ephemeral conversation [`Session`]s.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    /// [`Session`]s by the chat they belong to.
    sessions: Arc<RwLock<HashMap<user::ChatId, Session>>>,
}

/// Ephemeral state of one user's active dialog.
#[derive(Clone, Debug)]
pub struct Session {
    /// Active dialog [`Flow`] with its step data.
    pub flow: Flow,

    /// When the user last interacted with the dialog.
    pub last_activity: DateTime,
}

impl SessionStore {
    /// Creates a new empty [`SessionStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active [`Flow`] of the provided chat, if any.
    pub async fn get(&self, chat_id: user::ChatId) -> Option<Flow> {
        self.sessions
            .read()
            .await
            .get(&chat_id)
            .map(|s| s.flow.clone())
    }

    /// Stores the provided [`Flow`] as the chat's active dialog, stamping
    /// the activity time.
    pub async fn put(&self, chat_id: user::ChatId, flow: Flow) {
        drop(self.sessions.write().await.insert(
            chat_id,
            Session {
                flow,
                last_activity: DateTime::now(),
            },
        ));
    }

    /// Discards the active dialog of the provided chat, if any.
    pub async fn remove(&self, chat_id: user::ChatId) {
        drop(self.sessions.write().await.remove(&chat_id));
    }

    /// Removes all [`Session`]s idle for longer than the provided duration,
    /// returning how many were removed.
    ///
    /// An abandoned dialog holds no durable state, so expiry is a pure
    /// in-process cleanup.
    pub async fn sweep(&self, idle_for: Duration) -> usize {
        let deadline = DateTime::now() - idle_for;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity > deadline);
        before - sessions.len()
    }

    /// Returns the number of active [`Session`]s.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Indicates whether there are no active [`Session`]s.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use crate::dialog::{booking, Flow};

    use super::SessionStore;

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let store = SessionStore::new();
        store
            .put(1.into(), Flow::Booking(booking::Flow::SelectCity))
            .await;
        store
            .put(2.into(), Flow::Booking(booking::Flow::SelectCity))
            .await;

        // Fresh sessions survive a TTL-respecting sweep.
        assert_eq!(store.sweep(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.len().await, 2);

        // A zero TTL expires everything.
        assert_eq!(store.sweep(Duration::ZERO).await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn remove_discards_the_flow() {
        let store = SessionStore::new();
        store
            .put(1.into(), Flow::Booking(booking::Flow::SelectCity))
            .await;
        store.remove(1.into()).await;
        assert!(store.get(1.into()).await.is_none());
    }
}
