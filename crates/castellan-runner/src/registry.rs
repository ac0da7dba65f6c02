//! Registry of running sessions.

use crate::session::{spawn_session, SessionError, SessionHandle, SessionSettings};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared across all driver tasks
pub struct SessionRegistry {
    /// Active sessions by id
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Start a session and register its handle
    pub fn create(&self, settings: &SessionSettings) -> Result<(SessionHandle, JoinHandle<()>), SessionError> {
        let (handle, task) = spawn_session(settings)?;
        self.sessions.insert(handle.id(), handle.clone());
        info!(session = %handle.id(), active = self.sessions.len(), "session registered");
        Ok((handle, task))
    }

    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.get(&id).map(|h| h.clone())
    }

    /// Drop a session's handle. Its task ends once no other handle is left.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// End every registered round now. Returns how many sessions accepted.
    pub async fn abort_all(&self) -> usize {
        let mut aborted = 0;
        // Handles are cloned out so no map guard is held across an await
        for id in self.ids() {
            let Some(handle) = self.get(id) else {
                continue;
            };
            match handle.abort().await {
                Ok(_) => aborted += 1,
                Err(e) => warn!(session = %id, "abort failed: {}", e),
            }
        }
        aborted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
