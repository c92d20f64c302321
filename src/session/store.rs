use super::{Session, SessionDefaults};
use crate::persona::PersonaCatalog;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Shared handle to one room's session. Holding the lock serializes every
/// command for that room, including the remote completion call.
pub type SessionHandle = Arc<AsyncMutex<Session>>;

/// In-memory sessions keyed by room id.
pub struct SessionStore {
    catalog: Arc<PersonaCatalog>,
    defaults: SessionDefaults,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new(catalog: Arc<PersonaCatalog>, defaults: SessionDefaults) -> Self {
        Self {
            catalog,
            defaults,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    /// Existing session for `room_id`, or a freshly seeded one.
    pub fn get_or_create(&self, room_id: &str) -> SessionHandle {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let total = sessions.len();
        sessions
            .entry(room_id.to_string())
            .or_insert_with(|| {
                tracing::info!(room = %room_id, rooms = total + 1, "Creating session");
                Arc::new(AsyncMutex::new(Session::new(
                    room_id,
                    &self.catalog,
                    &self.defaults,
                )))
            })
            .clone()
    }

    /// Restore the room's transcripts to the catalog, creating the session if needed.
    pub async fn reset(&self, room_id: &str) {
        let handle = self.get_or_create(room_id);
        let mut session = handle.lock().await;
        session.reset_transcripts(&self.catalog);
        tracing::info!(
            room = %room_id,
            persona = %session.active_persona(),
            "Reset prompt"
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
