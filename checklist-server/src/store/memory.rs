use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use checklist_core::{ChecklistError, ChecklistResult, TableName, Task, TaskScope, TaskSection};

use super::{ChecklistStore, UserRecord};

#[derive(Debug, Clone)]
struct StoredTask {
    task: Task,
    owner: Option<i64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    missing_tables: BTreeSet<TableName>,
    sections: BTreeMap<String, TaskSection>,
    tasks: BTreeMap<String, StoredTask>,
    users: Vec<UserRecord>,
    next_user_id: i64,
    read_failure: Option<String>,
    list_failure: Option<String>,
    write_failure: Option<String>,
    // (completed value, delay) applied to matching completion writes
    write_delay: Option<(bool, Duration)>,
}

impl MemoryState {
    fn check_read(&self, table: Option<TableName>) -> ChecklistResult<()> {
        if let Some(message) = &self.read_failure {
            return Err(ChecklistError::QueryFailed(message.clone()));
        }
        match table {
            Some(table) if self.missing_tables.contains(&table) => Err(
                ChecklistError::QueryFailed(format!("relation \"{}\" does not exist", table)),
            ),
            _ => Ok(()),
        }
    }

    fn check_write(&self, table: Option<TableName>) -> ChecklistResult<()> {
        if let Some(message) = &self.write_failure {
            return Err(ChecklistError::PersistFailed(message.clone()));
        }
        match table {
            Some(table) if self.missing_tables.contains(&table) => Err(
                ChecklistError::PersistFailed(format!("relation \"{}\" does not exist", table)),
            ),
            _ => Ok(()),
        }
    }

    fn check_list(&self, table: TableName) -> ChecklistResult<()> {
        self.check_read(Some(table))?;
        match &self.list_failure {
            Some(message) => Err(ChecklistError::QueryFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn scoped_tasks(&self, scope: TaskScope) -> impl Iterator<Item = &StoredTask> {
        self.tasks
            .values()
            .filter(move |stored| stored.owner == scope.owner())
    }
}

/// In-process store with the same row semantics as the PostgreSQL schema
/// (ordering, foreign keys, unique usernames). Tables can be removed and
/// failures injected to exercise the lifecycle's error paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Empty store with every table present.
    pub fn new() -> Self {
        let store = Self::default();
        store.state().next_user_id = 1;
        store
    }

    /// Store where the setup script has not been run yet.
    pub fn without_tables() -> Self {
        let store = Self::new();
        store.state().missing_tables = TableName::REQUIRED.into_iter().collect();
        store
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// What running the DDL part of the setup script does.
    pub fn create_tables(&self) {
        self.state().missing_tables.clear();
    }

    pub fn drop_table(&self, table: TableName) {
        let mut state = self.state();
        state.missing_tables.insert(table);
        match table {
            TableName::TaskSections => {
                // ON DELETE CASCADE
                state.sections.clear();
                state.tasks.clear();
            }
            TableName::Tasks => state.tasks.clear(),
        }
    }

    /// Make every read fail with `message` until cleared with `None`.
    pub fn fail_reads(&self, message: Option<&str>) {
        self.state().read_failure = message.map(str::to_string);
    }

    /// Make row listings fail while table probes still succeed.
    pub fn fail_listing(&self, message: Option<&str>) {
        self.state().list_failure = message.map(str::to_string);
    }

    /// Make every write fail with `message` until cleared with `None`.
    pub fn fail_writes(&self, message: Option<&str>) {
        self.state().write_failure = message.map(str::to_string);
    }

    /// Hold every completion write that sets `completed` for `delay` before
    /// applying it. Other writes go through at once.
    pub fn delay_writes(&self, delay: Option<(bool, Duration)>) {
        self.state().write_delay = delay;
    }

    pub fn section_count(&self) -> usize {
        self.state().sections.len()
    }

    pub fn task_count(&self) -> usize {
        self.state().tasks.len()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.state().tasks.get(task_id).map(|stored| stored.task.clone())
    }

    pub fn task_owner(&self, task_id: &str) -> Option<i64> {
        self.state().tasks.get(task_id).and_then(|stored| stored.owner)
    }
}

#[async_trait]
impl ChecklistStore for MemoryStore {
    async fn probe(&self, table: TableName) -> ChecklistResult<()> {
        self.state().check_read(Some(table))
    }

    async fn list_sections(&self) -> ChecklistResult<Vec<TaskSection>> {
        let state = self.state();
        state.check_list(TableName::TaskSections)?;

        let mut sections: Vec<TaskSection> = state.sections.values().cloned().collect();
        sections.sort_by_key(|section| section.order_index);
        Ok(sections)
    }

    async fn list_tasks(&self, scope: TaskScope) -> ChecklistResult<Vec<Task>> {
        let state = self.state();
        state.check_list(TableName::Tasks)?;

        let mut tasks: Vec<Task> = state
            .scoped_tasks(scope)
            .map(|stored| stored.task.clone())
            .collect();
        tasks.sort_by_key(|task| task.order_index);
        Ok(tasks)
    }

    async fn has_sections(&self) -> ChecklistResult<bool> {
        let state = self.state();
        state.check_read(Some(TableName::TaskSections))?;
        Ok(!state.sections.is_empty())
    }

    async fn count_tasks(&self, scope: TaskScope) -> ChecklistResult<i64> {
        let state = self.state();
        state.check_read(Some(TableName::Tasks))?;
        Ok(state.scoped_tasks(scope).count() as i64)
    }

    async fn set_completed(&self, task_id: &str, completed: bool) -> ChecklistResult<u64> {
        let delay = self
            .state()
            .write_delay
            .filter(|(value, _)| *value == completed)
            .map(|(_, delay)| delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.check_write(Some(TableName::Tasks))?;

        match state.tasks.get_mut(task_id) {
            Some(stored) => {
                stored.task.completed = completed;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn upsert_seed(
        &self,
        sections: &[TaskSection],
        tasks: &[Task],
        owner: Option<i64>,
    ) -> ChecklistResult<()> {
        let mut state = self.state();
        state.check_write(Some(TableName::TaskSections))?;
        state.check_write(Some(TableName::Tasks))?;

        // validate everything first so a failure leaves no partial rows
        for task in tasks {
            let known = state.sections.contains_key(&task.section_id)
                || sections.iter().any(|section| section.id == task.section_id);
            if !known {
                return Err(ChecklistError::PersistFailed(format!(
                    "insert on table \"tasks\" violates foreign key: section {} does not exist",
                    task.section_id
                )));
            }
        }

        for section in sections {
            state.sections.insert(section.id.clone(), section.clone());
        }
        for task in tasks {
            state
                .tasks
                .entry(task.id.clone())
                .and_modify(|stored| {
                    stored.task.section_id = task.section_id.clone();
                    stored.task.title = task.title.clone();
                    stored.task.order_index = task.order_index;
                })
                .or_insert_with(|| StoredTask {
                    task: task.clone(),
                    owner,
                });
        }
        Ok(())
    }

    async fn insert_tasks(&self, tasks: &[Task], owner: Option<i64>) -> ChecklistResult<()> {
        let mut state = self.state();
        state.check_write(Some(TableName::Tasks))?;

        for task in tasks {
            if !state.sections.contains_key(&task.section_id) {
                return Err(ChecklistError::PersistFailed(format!(
                    "insert on table \"tasks\" violates foreign key: section {} does not exist",
                    task.section_id
                )));
            }
            if state.tasks.contains_key(&task.id) {
                return Err(ChecklistError::PersistFailed(format!(
                    "duplicate key value violates unique constraint: task {}",
                    task.id
                )));
            }
        }

        for task in tasks {
            state.tasks.insert(
                task.id.clone(),
                StoredTask {
                    task: task.clone(),
                    owner,
                },
            );
        }
        Ok(())
    }

    async fn find_user(&self, username: &str) -> ChecklistResult<Option<UserRecord>> {
        let state = self.state();
        state.check_read(None)?;
        Ok(state.users.iter().find(|user| user.username == username).cloned())
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> ChecklistResult<UserRecord> {
        let mut state = self.state();
        state.check_write(None)?;

        if state.users.iter().any(|user| user.username == username) {
            return Err(ChecklistError::DuplicateUsername);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: state.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.next_user_id += 1;
        state.users.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checklist_core::seed;

    #[tokio::test]
    async fn test_missing_tables_fail_probes() {
        let store = MemoryStore::without_tables();
        assert!(store.probe(TableName::TaskSections).await.is_err());
        assert!(store.probe(TableName::Tasks).await.is_err());

        store.create_tables();
        assert!(store.probe(TableName::TaskSections).await.is_ok());
        assert!(store.list_sections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_completed_flag() {
        let store = MemoryStore::new();
        let tasks = seed::seed_tasks(TaskScope::Shared);
        store
            .upsert_seed(&seed::seed_sections(), &tasks, None)
            .await
            .unwrap();
        store.set_completed("task2", true).await.unwrap();

        store
            .upsert_seed(&seed::seed_sections(), &tasks, None)
            .await
            .unwrap();

        assert_eq!(store.section_count(), 3);
        assert_eq!(store.task_count(), 9);
        assert!(store.task("task2").unwrap().completed);
    }

    #[tokio::test]
    async fn test_insert_tasks_enforces_foreign_key() {
        let store = MemoryStore::new();
        let err = store
            .insert_tasks(&seed::seed_tasks(TaskScope::Owner(1)), Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ChecklistError::PersistFailed(_)));
        assert_eq!(store.task_count(), 0);
    }

    #[tokio::test]
    async fn test_scoped_listing() {
        let store = MemoryStore::new();
        store
            .upsert_seed(&seed::seed_sections(), &seed::seed_tasks(TaskScope::Shared), None)
            .await
            .unwrap();
        store
            .insert_tasks(&seed::seed_tasks(TaskScope::Owner(7)), Some(7))
            .await
            .unwrap();

        let shared = store.list_tasks(TaskScope::Shared).await.unwrap();
        let owned = store.list_tasks(TaskScope::Owner(7)).await.unwrap();

        assert_eq!(shared.len(), 9);
        assert_eq!(owned.len(), 9);
        assert!(owned.iter().all(|task| task.id.ends_with("_user7")));
        assert_eq!(store.count_tasks(TaskScope::Owner(8)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unique_usernames() {
        let store = MemoryStore::new();
        let first = store.insert_user("alice", "h1").await.unwrap();
        let second = store.insert_user("bob", "h2").await.unwrap();
        assert_ne!(first.id, second.id);

        let err = store.insert_user("alice", "h3").await.unwrap_err();
        assert_eq!(err, ChecklistError::DuplicateUsername);

        // case-sensitive
        assert!(store.insert_user("Alice", "h4").await.is_ok());
    }
}
