//! Process-local store of progressive analysis sessions.
//!
//! Each session lives in its own [`SessionSlot`]. The slot carries a
//! writer gate, held by whoever is processing a clip for that session,
//! and the session state behind a separate lock so snapshots are never
//! blocked by a slow model call. The id map itself is only locked for
//! lookups and inserts, so unrelated sessions never contend.

use crate::error::SessionError;
use crate::models::AnalysisSession;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;

/// One session plus its synchronization.
#[derive(Debug)]
pub struct SessionSlot {
    writer: Arc<Mutex<()>>,
    state: RwLock<AnalysisSession>,
}

impl SessionSlot {
    pub fn new(session: AnalysisSession) -> Self {
        Self {
            writer: Arc::new(Mutex::new(())),
            state: RwLock::new(session),
        }
    }

    /// Exclusive right to mutate this session; hold it across the whole
    /// read-call-write sequence.
    pub async fn lock_writer(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.writer).lock_owned().await
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> AnalysisSession {
        self.state.read().await.clone()
    }

    /// Apply `f` to the state under the state lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut AnalysisSession) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }
}

pub type SessionHandle = Arc<SessionSlot>;

/// Keyed session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Existing session for `session_id`, or a fresh empty one.
    async fn get_or_create(&self, session_id: &str) -> SessionHandle;

    async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError>;

    /// Remove a session. Returns whether it existed.
    async fn delete(&self, session_id: &str) -> bool;

    /// Number of live sessions.
    async fn len(&self) -> usize;
}

/// In-memory store; everything is lost on restart.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    skill_level: String,
}

impl InMemorySessionStore {
    pub fn new(skill_level: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            skill_level: skill_level.into(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(crate::models::DEFAULT_SKILL_LEVEL)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(slot) = self.sessions.read().await.get(session_id) {
            return Arc::clone(slot);
        }

        // Re-check under the write lock: another task may have won the race.
        let mut sessions = self.sessions.write().await;
        let slot = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!("Creating analysis session {}", session_id);
            let mut session = AnalysisSession::new(session_id);
            session.skill_level = self.skill_level.clone();
            Arc::new(SessionSlot::new(session))
        });
        Arc::clone(slot)
    }

    async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    async fn delete(&self, session_id: &str) -> bool {
        let existed = self.sessions.write().await.remove(session_id).is_some();
        if existed {
            info!("Deleted analysis session {}", session_id);
        }
        existed
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_get_or_create_reuses_session() {
        let store = InMemorySessionStore::default();
        let first = store.get_or_create("s1").await;
        let second = store.get_or_create("s1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_new_session_uses_configured_skill_level() {
        let store = InMemorySessionStore::new("beginner");
        let slot = store.get_or_create("s1").await;
        let session = slot.snapshot().await;
        assert_eq!(session.skill_level, "beginner");
        assert!(session.feedback_list.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = InMemorySessionStore::default();
        let err = assert_err!(store.get("missing").await);
        assert_eq!(err, SessionError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let store = InMemorySessionStore::default();
        store.get_or_create("s1").await;

        assert_ok!(store.get("s1").await);
        assert!(store.delete("s1").await);
        assert_err!(store.get("s1").await);
        // Deleting again is a harmless no-op
        assert!(!store.delete("s1").await);
        assert!(!store.delete("never-existed").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creation_yields_one_session() {
        let store = Arc::new(InMemorySessionStore::default());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_or_create("shared").await })
            })
            .collect();

        let slots = futures::future::try_join_all(handles).await.unwrap();
        assert!(slots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_is_visible_in_snapshot() {
        let slot = SessionSlot::new(AnalysisSession::new("s1"));
        slot.update(|s| s.skill_level = "advanced".to_string()).await;
        assert_eq!(slot.snapshot().await.skill_level, "advanced");
    }
}
