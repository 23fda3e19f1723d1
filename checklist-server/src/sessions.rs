use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use checklist_core::{ChecklistError, ChecklistResult, TaskScope, User};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::controller::ChecklistController;
use crate::store::StoreHandle;

/// One open checklist: a signed-in user's own tasks or the shared list.
#[derive(Clone)]
pub struct Session {
    pub user: Option<User>,
    pub controller: Arc<Mutex<ChecklistController>>,
    pub created_at: DateTime<Utc>,
    pub last_seen: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("created_at", &self.created_at)
            .field("last_seen", &self.last_seen)
            .finish_non_exhaustive()
    }
}

// session_id -> session
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a controller for `user` (or the shared list) and register it.
    pub async fn open(&self, store: Option<StoreHandle>, user: Option<User>) -> (Uuid, Session) {
        let scope = match &user {
            Some(user) => TaskScope::Owner(user.id),
            None => TaskScope::Shared,
        };

        let mut controller = ChecklistController::new(store, scope);
        controller.start().await;

        let session_id = Uuid::new_v4();
        let session = Session {
            user,
            controller: Arc::new(Mutex::new(controller)),
            created_at: Utc::now(),
            last_seen: Instant::now(),
        };
        self.sessions.insert(session_id, session.clone());

        tracing::info!(%session_id, ?scope, "Opened session");
        (session_id, session)
    }

    /// Look up a session and mark it as used.
    pub fn get(&self, session_id: &Uuid) -> ChecklistResult<Session> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(ChecklistError::SessionNotFound(*session_id))?;
        entry.last_seen = Instant::now();
        Ok(entry.value().clone())
    }

    pub fn close(&self, session_id: &Uuid) -> ChecklistResult<()> {
        match self.sessions.remove(session_id) {
            Some(_) => {
                tracing::info!(%session_id, "Closed session");
                Ok(())
            }
            None => Err(ChecklistError::SessionNotFound(*session_id)),
        }
    }

    /// Drop every session unused for longer than `max_idle`. Returns how many
    /// were dropped. Writes already spawned by a dropped controller still run
    /// to completion.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|session_id, session| {
            let keep = session.last_seen.elapsed() <= max_idle;
            if !keep {
                tracing::info!(%session_id, "Evicting idle session");
            }
            keep
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Run `evict_idle` every `every` until the returned handle is aborted.
    pub fn spawn_sweeper(&self, max_idle: Duration, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let evicted = registry.evict_idle(max_idle);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = registry.len(), "Swept idle sessions");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
