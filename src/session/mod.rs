//! Session store: one live agent per session id, shared across callers.
//!
//! The map itself sits behind a mutex that is only held for lookups and
//! inserts. Each agent has its own mutex; a caller that cannot take it
//! immediately gets [`TetherError::SessionBusy`], so at most one run or
//! resume is in flight per session.

pub mod service;

pub use service::{AgentFactory, ChatRequest, ChatResponse, ChatStatus, SessionService};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::config::SessionSettings;
use crate::error::{Result, TetherError};

/// Shared handle to a session's agent.
pub type SessionHandle = Arc<Mutex<Agent>>;

#[derive(Debug)]
struct SessionEntry {
    agent: SessionHandle,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

impl SessionEntry {
    fn new(agent: Agent) -> Self {
        let now = Utc::now();
        Self {
            agent: Arc::new(Mutex::new(agent)),
            created_at: now,
            last_access: now,
        }
    }

    /// Nobody is running or resuming the agent right now.
    fn is_idle(&self) -> bool {
        self.agent.try_lock().is_ok()
    }
}

/// Point-in-time view of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

/// Bounded, TTL-evicting map from session id to agent.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    capacity: usize,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.capacity, Duration::from_secs(settings.ttl_secs))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a session and refresh its last access time.
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(id)?;
        entry.last_access = Utc::now();
        Some(entry.agent.clone())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    /// Store `agent` under `id`, replacing any idle session with that id.
    pub async fn insert(&self, id: impl Into<String>, agent: Agent) -> Result<SessionHandle> {
        let id = id.into();
        let mut sessions = self.sessions.lock().await;
        if sessions.get(&id).is_some_and(|entry| !entry.is_idle()) {
            return Err(TetherError::SessionBusy(id));
        }
        sessions.remove(&id);
        self.make_room(&mut sessions)?;

        let entry = SessionEntry::new(agent);
        let handle = entry.agent.clone();
        sessions.insert(id.clone(), entry);
        info!(session_id = %id, sessions = sessions.len(), "created session");
        Ok(handle)
    }

    /// Return the session for `id`, creating it with `create` if absent, and
    /// take exclusive use of its agent before the map lock is released, so
    /// no concurrent insert can evict it in between.
    pub async fn get_or_insert_and_acquire<F>(&self, id: &str, create: F) -> Result<OwnedMutexGuard<Agent>>
    where
        F: FnOnce() -> Result<Agent>,
    {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(id) {
            entry.last_access = Utc::now();
            return Self::acquire(id, &entry.agent);
        }

        self.make_room(&mut sessions)?;
        let entry = SessionEntry::new(create()?);
        let guard = Self::acquire(id, &entry.agent)?;
        sessions.insert(id.to_string(), entry);
        info!(session_id = id, sessions = sessions.len(), "created session");
        Ok(guard)
    }

    /// Take exclusive use of a session's agent without waiting.
    pub fn acquire(id: &str, handle: &SessionHandle) -> Result<OwnedMutexGuard<Agent>> {
        handle
            .clone()
            .try_lock_owned()
            .map_err(|_| TetherError::SessionBusy(id.to_string()))
    }

    /// Drop a session. In-flight callers keep their handle until they finish.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id).is_some();
        if removed {
            info!(session_id = id, "removed session");
        }
        removed
    }

    /// Evict idle sessions whose last access is older than the TTL.
    pub async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        self.evict_expired_locked(&mut sessions)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        let mut infos: Vec<_> = sessions
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: id.clone(),
                created_at: entry.created_at,
                last_access: entry.last_access,
            })
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    /// Drop every session.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.len();
        sessions.clear();
        info!(sessions = count, "session store shut down");
    }

    fn evict_expired_locked(&self, sessions: &mut HashMap<String, SessionEntry>) -> usize {
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now - entry.last_access < self.ttl || !entry.is_idle();
            if !keep {
                debug!(session_id = %id, "evicting expired session");
            }
            keep
        });
        before - sessions.len()
    }

    /// Evict expired sessions, then the least recently used idle ones,
    /// until one more session fits.
    fn make_room(&self, sessions: &mut HashMap<String, SessionEntry>) -> Result<()> {
        self.evict_expired_locked(sessions);
        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| entry.is_idle())
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone());
            let Some(id) = oldest else {
                return Err(TetherError::InvalidState(format!(
                    "Session store is full ({} sessions in flight)",
                    sessions.len()
                )));
            };
            debug!(session_id = %id, "evicting least recently used session");
            sessions.remove(&id);
        }
        Ok(())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_settings(&SessionSettings::default())
    }
}
