//! Access to the relational store that holds users, sections and tasks.
//!
//! [`ChecklistStore`] is the row-level contract the adapters are written
//! against; [`StoreHandle`] is the shared handle that exists only when the
//! store is configured.

pub mod memory;
pub mod postgres;

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checklist_core::{ChecklistResult, TableName, Task, TaskScope, TaskSection, User};

use crate::config::StoreConfig;
use crate::errors::ServerError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// A `users` row including the password hash. Never leaves the server.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
pub trait ChecklistStore: Send + Sync {
    /// Bounded read (`LIMIT 1`) against `table`.
    async fn probe(&self, table: TableName) -> ChecklistResult<()>;

    async fn list_sections(&self) -> ChecklistResult<Vec<TaskSection>>;

    async fn list_tasks(&self, scope: TaskScope) -> ChecklistResult<Vec<Task>>;

    async fn has_sections(&self) -> ChecklistResult<bool>;

    async fn count_tasks(&self, scope: TaskScope) -> ChecklistResult<i64>;

    /// Set `completed` and `updated_at` on one task, returning the number of
    /// rows matched.
    async fn set_completed(&self, task_id: &str, completed: bool) -> ChecklistResult<u64>;

    /// Upsert sections then tasks by id in one transaction. Existing tasks
    /// keep their `completed` flag.
    async fn upsert_seed(
        &self,
        sections: &[TaskSection],
        tasks: &[Task],
        owner: Option<i64>,
    ) -> ChecklistResult<()>;

    /// Plain insert of new task rows owned by `owner`.
    async fn insert_tasks(&self, tasks: &[Task], owner: Option<i64>) -> ChecklistResult<()>;

    async fn find_user(&self, username: &str) -> ChecklistResult<Option<UserRecord>>;

    /// Fails with `DuplicateUsername` when the name is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> ChecklistResult<UserRecord>;
}

/// Shared handle to a configured store.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn ChecklistStore>,
    backend: &'static str,
}

impl StoreHandle {
    pub fn new<S: ChecklistStore + 'static>(store: S, backend: &'static str) -> Self {
        Self {
            inner: Arc::new(store),
            backend,
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self::new(store, "memory")
    }

    /// Open the store described by `config`. `memory:` URLs get an
    /// in-process store; anything else is treated as a PostgreSQL URL.
    pub fn open(config: &StoreConfig) -> Result<Self, ServerError> {
        if config.is_memory() {
            tracing::warn!("Using in-process memory store, data will not survive a restart");
            return Ok(Self::memory(MemoryStore::new()));
        }

        let store = PostgresStore::connect_lazy(&config.url, &config.api_key)?;
        Ok(Self::new(store, "postgres"))
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

impl Deref for StoreHandle {
    type Target = dyn ChecklistStore;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("backend", &self.backend)
            .finish()
    }
}
