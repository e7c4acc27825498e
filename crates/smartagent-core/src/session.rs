//! Session Management
//!
//! Sessions map a caller-supplied id to its persisted conversation. A chat
//! turn checks its session out for its whole duration, so two turns on the
//! same id run one after the other instead of overwriting each other's
//! history. Turns on different ids do not block each other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::message::Conversation;

/// Caller-supplied session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self("default".into())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted conversation and its bookkeeping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Persisted history (user and assistant turns only)
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with the given id
    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: Conversation::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the persisted history at the end of a chat turn
    pub fn commit(&mut self, conversation: Conversation) {
        self.conversation = conversation;
        self.updated_at = Utc::now();
    }

    /// Turn count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

/// Exclusive handle on one session, released on drop
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Session store with per-session exclusive access
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Lock a session for a chat turn, creating it empty if unknown.
    /// Waits while another turn holds the same id.
    async fn checkout(&self, id: &SessionId) -> SessionGuard;

    /// Copy of a session, if it exists
    async fn snapshot(&self, id: &SessionId) -> Option<Session>;

    /// Delete a session once any turn in progress on it has committed;
    /// returns whether it existed
    async fn remove(&self, id: &SessionId) -> bool;

    /// Number of known sessions
    async fn len(&self) -> usize;
}

/// In-memory session store; contents are lost on restart
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: &SessionId) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.read().await.get(id) {
            return existing.clone();
        }

        self.sessions
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::with_id(id.clone()))))
            .clone()
    }

    async fn is_current(&self, id: &SessionId, entry: &Arc<Mutex<Session>>) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn checkout(&self, id: &SessionId) -> SessionGuard {
        loop {
            let entry = self.entry(id).await;
            let guard = entry.clone().lock_owned().await;

            // A delete may have dropped this entry while we waited for it
            if self.is_current(id, &entry).await {
                return guard;
            }
        }
    }

    async fn snapshot(&self, id: &SessionId) -> Option<Session> {
        let entry = self.sessions.read().await.get(id).cloned()?;
        let session = entry.lock().await;
        Some(session.clone())
    }

    async fn remove(&self, id: &SessionId) -> bool {
        let Some(entry) = self.sessions.read().await.get(id).cloned() else {
            return false;
        };

        // Let an in-flight turn commit before the session goes away
        let _turn = entry.lock().await;

        let mut sessions = self.sessions.write().await;
        if sessions.get(id).is_some_and(|current| Arc::ptr_eq(current, &entry)) {
            sessions.remove(id);
            true
        } else {
            false
        }
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Turn;
    use std::time::Duration;

    #[test]
    fn test_session_creation() {
        let session = Session::with_id(SessionId::default());
        assert_eq!(session.id.as_str(), "default");
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        let id = SessionId::from_string("abc");

        assert!(store.snapshot(&id).await.is_none());

        {
            let mut session = store.checkout(&id).await;
            session.commit([Turn::user("hi"), Turn::assistant("hello")].into_iter().collect());
        }

        let loaded = store.snapshot(&id).await.unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.message_count(), 2);
        assert_eq!(store.len().await, 1);

        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
        assert!(store.snapshot(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_checkout_serializes_same_session() {
        let store = Arc::new(MemorySessionStore::new());
        let id = SessionId::from_string("shared");

        let first = store.checkout(&id).await;

        let waiter = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let mut session = store.checkout(&id).await;
                let mut history = session.conversation.clone();
                history.push(Turn::user("second"));
                session.commit(history);
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let mut first = first;
        let mut history = first.conversation.clone();
        history.push(Turn::user("first"));
        first.commit(history);
        drop(first);

        waiter.await.unwrap();
        let contents: Vec<_> = store
            .snapshot(&id)
            .await
            .unwrap()
            .conversation
            .turns()
            .iter()
            .map(|t| t.content.clone())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_remove_waits_for_turn_in_progress() {
        let store = Arc::new(MemorySessionStore::new());
        let id = SessionId::from_string("busy");

        let mut turn = store.checkout(&id).await;

        let remover = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.remove(&id).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!remover.is_finished());

        turn.commit([Turn::user("hi"), Turn::assistant("hello")].into_iter().collect());
        drop(turn);

        assert!(remover.await.unwrap());
        assert!(store.snapshot(&id).await.is_none());

        let fresh = store.checkout(&id).await;
        assert_eq!(fresh.message_count(), 0);
        drop(fresh);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_checkout_after_remove_never_reuses_dropped_entry() {
        let store = Arc::new(MemorySessionStore::new());
        let id = SessionId::from_string("gone");

        let turn = store.checkout(&id).await;

        let remover = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.remove(&id).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(turn);
        assert!(remover.await.unwrap());

        let mut next = store.checkout(&id).await;
        next.commit([Turn::user("again")].into_iter().collect());
        drop(next);

        let session = store.snapshot(&id).await.unwrap();
        assert_eq!(session.message_count(), 1);
    }

    #[tokio::test]
    async fn test_other_sessions_are_not_blocked() {
        let store = MemorySessionStore::new();
        let _held = store.checkout(&SessionId::from_string("a")).await;

        let other = tokio::time::timeout(
            Duration::from_millis(100),
            store.checkout(&SessionId::from_string("b")),
        )
        .await;
        assert!(other.is_ok());
    }
}
