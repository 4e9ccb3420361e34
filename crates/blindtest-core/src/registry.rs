//! Registry of live game sessions keyed by [`SessionId`].
//!
//! Sessions are created and evicted explicitly by the host. Evicting a
//! session finishes its active round (so its `roundOver` is still
//! emitted) and stops it.

use std::collections::BTreeMap;
use std::sync::Arc;

use blindtest_types::SessionId;
use tokio::sync::RwLock;
use tracing::info;

use crate::session::Session;
use crate::sink::EventSink;

/// Errors returned by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A session with this id is already registered.
    #[error("session {session_id} already exists")]
    AlreadyExists {
        /// The conflicting id.
        session_id: SessionId,
    },
}

/// Map of session id to session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session emitting into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyExists`] if `id` is taken.
    pub async fn create(
        &self,
        id: SessionId,
        sink: impl EventSink + 'static,
    ) -> Result<Arc<Session>, RegistryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(RegistryError::AlreadyExists { session_id: id });
        }
        let session = Arc::new(Session::new(id.clone(), sink));
        sessions.insert(id.clone(), Arc::clone(&session));
        info!(session = %id, total = sessions.len(), "session created");
        Ok(session)
    }

    /// Look up a session.
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Look up a session, creating it with the sink from `make_sink` if absent.
    pub async fn get_or_create<S, F>(&self, id: SessionId, make_sink: F) -> Arc<Session>
    where
        S: EventSink + 'static,
        F: FnOnce() -> S,
    {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&id) {
            return Arc::clone(existing);
        }
        let session = Arc::new(Session::new(id.clone(), make_sink()));
        sessions.insert(id.clone(), Arc::clone(&session));
        info!(session = %id, total = sessions.len(), "session created");
        session
    }

    /// Remove a session, finishing its active round and stopping it.
    ///
    /// Returns `false` if no such session was registered.
    pub async fn evict(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id);
        let Some(session) = removed else {
            return false;
        };
        let finished = session.finish_round().await;
        session.stop().await;
        info!(session = %id, finished_round = finished, "session evicted");
        true
    }

    /// Ids of all registered sessions.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
