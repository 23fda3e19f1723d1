//! Connection and initialization lifecycle of one checklist session.
//!
//! ```text
//! NotConfigured                      (no store: built-in data, terminal)
//! Connecting -> Connected            (tables and rows present)
//!            -> NeedsInit            (tables or rows missing)
//!            -> Error                (load failed)
//! NeedsInit  -> Initializing -> Connecting | NeedsInit
//! NeedsInit | Error -> Connecting    (test connection, setup done)
//! any configured -> Error            (test connection probe failed)
//! ```
//!
//! Every path that can't read from the store falls back to the built-in
//! dataset, so the board is never empty.

use std::collections::HashMap;
use std::sync::Arc;

use checklist_core::{
    BoardView, ChecklistError, ChecklistResult, ConnectionStatus, InitializeOutcome,
    ReconciliationEntry, ReconciliationLog, TaskBoard, TaskScope,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::repository::TaskRepository;
use crate::schema::SchemaChecker;
use crate::setup::Initializer;
use crate::store::StoreHandle;

pub const NO_DATA_MESSAGE: &str = "No checklist data in the database yet. Insert the initial data.";

/// Result of a local toggle.
#[derive(Debug)]
pub struct Toggled {
    pub task_id: String,
    pub completed: bool,
    /// The background write, when one was issued. Awaiting it is optional.
    pub write: Option<JoinHandle<()>>,
}

pub struct ChecklistController {
    store: Option<StoreHandle>,
    scope: TaskScope,
    status: ConnectionStatus,
    message: Option<String>,
    board: TaskBoard,
    reconciliation: Arc<Mutex<ReconciliationLog>>,
    // task_id -> flips to true once the newest write for that task is done
    pending_writes: HashMap<String, watch::Receiver<bool>>,
}

impl ChecklistController {
    pub fn new(store: Option<StoreHandle>, scope: TaskScope) -> Self {
        Self {
            store,
            scope,
            status: ConnectionStatus::NotConfigured,
            message: None,
            board: TaskBoard::default(),
            reconciliation: Arc::new(Mutex::new(ReconciliationLog::new())),
            pending_writes: HashMap::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub fn scope(&self) -> TaskScope {
        self.scope
    }

    pub fn view(&self) -> BoardView {
        BoardView::new(&self.board, self.status, self.message.clone())
    }

    pub async fn reconciliation(&self) -> Vec<ReconciliationEntry> {
        self.reconciliation.lock().await.entries()
    }

    pub async fn has_divergence(&self) -> bool {
        self.reconciliation.lock().await.has_divergence()
    }

    fn fall_back(&mut self, status: ConnectionStatus, message: Option<String>) {
        self.status = status;
        self.message = message;
        self.board = TaskBoard::default_dataset();
    }

    /// Entry point: decide between local data and the store.
    pub async fn start(&mut self) {
        if self.store.is_none() {
            tracing::info!("Store not configured, using built-in checklist");
            self.fall_back(ConnectionStatus::NotConfigured, None);
            return;
        }
        self.load().await;
    }

    /// Check the schema, then load the board from the store.
    pub async fn load(&mut self) {
        let Some(store) = self.store.clone() else {
            self.fall_back(ConnectionStatus::NotConfigured, None);
            return;
        };

        self.status = ConnectionStatus::Connecting;
        self.message = None;
        // the board is about to be replaced, earlier toggles no longer apply
        self.wait_for_writes().await;
        self.reconciliation.lock().await.clear();

        let check = SchemaChecker::new(store.clone()).check_tables().await;
        if !check.all_present {
            let err = ChecklistError::SchemaMissing(check.missing_names());
            tracing::warn!(details = ?check.details, "{}", err);
            self.fall_back(ConnectionStatus::NeedsInit, Some(err.to_string()));
            return;
        }

        match TaskRepository::new(store).load_board(self.scope).await {
            Ok(board) if board.task_count() == 0 => {
                tracing::warn!(scope = ?self.scope, "Tables exist but hold no checklist rows");
                self.fall_back(ConnectionStatus::NeedsInit, Some(NO_DATA_MESSAGE.to_string()));
            }
            Ok(board) => {
                tracing::info!(
                    scope = ?self.scope,
                    sections = board.sections.len(),
                    tasks = board.task_count(),
                    "Loaded checklist from store"
                );
                self.board = board;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load checklist, using built-in data");
                self.fall_back(ConnectionStatus::Error, Some(e.to_string()));
            }
        }
    }

    /// Probe the store and reload on success. A failed probe moves to
    /// `Error` but keeps the board as it is.
    pub async fn test_connection(&mut self) -> ChecklistResult<()> {
        let Some(store) = self.store.clone() else {
            let err = ChecklistError::StoreNotConfigured;
            self.message = Some(err.to_string());
            return Err(err);
        };

        match SchemaChecker::new(store).probe_connection().await {
            Ok(()) => {
                self.load().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection test failed");
                self.status = ConnectionStatus::Error;
                self.message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Insert the seed rows, then reload. Only valid while `NeedsInit`.
    pub async fn initialize(&mut self) -> ChecklistResult<InitializeOutcome> {
        if self.status != ConnectionStatus::NeedsInit {
            return Err(ChecklistError::InvalidTransition {
                action: "initialize",
                status: self.status,
            });
        }
        let Some(store) = self.store.clone() else {
            return Err(ChecklistError::StoreNotConfigured);
        };

        self.status = ConnectionStatus::Initializing;
        match Initializer::new(store).insert_initial_data(self.scope).await {
            Ok(outcome) => {
                self.load().await;
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Initialization failed");
                self.status = ConnectionStatus::NeedsInit;
                self.message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The user ran the setup script by hand.
    pub async fn complete_manual_setup(&mut self) {
        tracing::info!("Setup script reported done, reloading");
        self.load().await;
    }

    /// Flip a task locally and, when connected, persist it in the
    /// background. The local flip is never undone.
    pub async fn toggle(&mut self, section_id: &str, task_id: &str) -> ChecklistResult<Toggled> {
        let completed = self.board.toggle(section_id, task_id)?;
        let connected = self.status == ConnectionStatus::Connected;

        self.reconciliation
            .lock()
            .await
            .record_toggle(task_id, completed, connected);

        let write = if connected {
            self.spawn_write(task_id.to_string(), completed)
        } else {
            None
        };

        Ok(Toggled {
            task_id: task_id.to_string(),
            completed,
            write,
        })
    }

    /// Re-send every rejected write, re-applying its value locally first.
    pub async fn retry_failed_writes(&mut self) -> ChecklistResult<Vec<JoinHandle<()>>> {
        if self.status != ConnectionStatus::Connected {
            return Err(ChecklistError::InvalidTransition {
                action: "retry failed writes",
                status: self.status,
            });
        }

        let failed = self.reconciliation.lock().await.failed();
        let mut writes = Vec::with_capacity(failed.len());
        for entry in failed {
            self.board.set_completed(&entry.task_id, entry.desired);
            self.reconciliation
                .lock()
                .await
                .record_toggle(&entry.task_id, entry.desired, true);
            writes.extend(self.spawn_write(entry.task_id, entry.desired));
        }

        tracing::info!(count = writes.len(), "Retrying failed writes");
        Ok(writes)
    }

    /// Wait until every write issued so far has landed or failed.
    pub async fn wait_for_writes(&mut self) {
        for (_, mut finished) in self.pending_writes.drain() {
            // a closed channel means the write task is gone, which is done too
            let _ = finished.wait_for(|done| *done).await;
        }
    }

    /// Writes for the same task run one after another in toggle order, so
    /// the store ends on the last value the user chose.
    fn spawn_write(&mut self, task_id: String, desired: bool) -> Option<JoinHandle<()>> {
        let repository = TaskRepository::new(self.store.clone()?);
        let reconciliation = self.reconciliation.clone();

        self.pending_writes.retain(|_, finished| !*finished.borrow());
        let (done, finished) = watch::channel(false);
        let previous = self.pending_writes.insert(task_id.clone(), finished);

        Some(tokio::spawn(async move {
            if let Some(mut previous) = previous {
                let _ = previous.wait_for(|done| *done).await;
            }

            let result = repository.set_completed(&task_id, desired).await;
            if let Err(e) = &result {
                tracing::error!(task_id = %task_id, completed = desired, error = %e, "Failed to save task state");
            }
            reconciliation
                .lock()
                .await
                .record_result(&task_id, desired, result.map_err(|e| e.to_string()));
            let _ = done.send(true);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChecklistStore, MemoryStore};
    use checklist_core::{seed, TableName};
    use std::time::Duration;

    async fn seeded_store() -> MemoryStore {
        let memory = MemoryStore::new();
        memory
            .upsert_seed(&seed::seed_sections(), &seed::seed_tasks(TaskScope::Shared), None)
            .await
            .unwrap();
        memory
    }

    async fn started(memory: &MemoryStore, scope: TaskScope) -> ChecklistController {
        let mut controller = ChecklistController::new(Some(StoreHandle::memory(memory.clone())), scope);
        controller.start().await;
        controller
    }

    #[tokio::test]
    async fn test_not_configured_uses_defaults() {
        let mut controller = ChecklistController::new(None, TaskScope::Shared);
        controller.start().await;

        assert_eq!(controller.status(), ConnectionStatus::NotConfigured);
        assert_eq!(controller.board(), &TaskBoard::default_dataset());
        assert!(controller.message().is_none());
    }

    #[tokio::test]
    async fn test_connected_loads_store_rows() {
        let memory = seeded_store().await;
        memory.set_completed("task2", true).await.unwrap();

        let controller = started(&memory, TaskScope::Shared).await;

        assert_eq!(controller.status(), ConnectionStatus::Connected);
        assert!(controller.board().task("phase1", "task2").unwrap().completed);
    }

    #[tokio::test]
    async fn test_load_failure_falls_back() {
        let memory = seeded_store().await;
        memory.set_completed("task1", true).await.unwrap();
        memory.fail_listing(Some("canceling statement due to statement timeout"));

        let controller = started(&memory, TaskScope::Shared).await;

        assert_eq!(controller.status(), ConnectionStatus::Error);
        assert!(controller
            .message()
            .unwrap()
            .contains("statement timeout"));
        assert_eq!(controller.board(), &TaskBoard::default_dataset());
    }

    #[tokio::test]
    async fn test_missing_tables_need_init() {
        let memory = seeded_store().await;
        memory.drop_table(TableName::Tasks);

        let controller = started(&memory, TaskScope::Shared).await;

        assert_eq!(controller.status(), ConnectionStatus::NeedsInit);
        assert_eq!(
            controller.message(),
            Some(ChecklistError::SchemaMissing(vec![TableName::Tasks]).to_string().as_str())
        );
        assert_eq!(controller.board(), &TaskBoard::default_dataset());
    }

    #[tokio::test]
    async fn test_setup_done_after_script() {
        let memory = MemoryStore::without_tables();
        let mut controller = started(&memory, TaskScope::Shared).await;
        assert_eq!(controller.status(), ConnectionStatus::NeedsInit);

        memory.create_tables();
        memory
            .upsert_seed(&seed::seed_sections(), &seed::seed_tasks(TaskScope::Shared), None)
            .await
            .unwrap();
        controller.complete_manual_setup().await;

        assert_eq!(controller.status(), ConnectionStatus::Connected);
        assert!(controller.message().is_none());
    }

    #[tokio::test]
    async fn test_test_connection_failure_keeps_board() {
        let memory = seeded_store().await;
        let mut controller = started(&memory, TaskScope::Shared).await;
        controller.toggle("phase1", "task1").await.unwrap();
        let before = controller.board().clone();

        memory.fail_reads(Some("connection refused"));
        let err = controller.test_connection().await.unwrap_err();

        assert!(matches!(err, ChecklistError::QueryFailed(_)));
        assert_eq!(controller.status(), ConnectionStatus::Error);
        assert_eq!(controller.message(), Some(err.to_string().as_str()));
        assert_eq!(controller.board(), &before);

        memory.fail_reads(None);
        controller.test_connection().await.unwrap();
        assert_eq!(controller.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_test_connection_without_store() {
        let mut controller = ChecklistController::new(None, TaskScope::Shared);
        controller.start().await;

        let err = controller.test_connection().await.unwrap_err();
        assert_eq!(err, ChecklistError::StoreNotConfigured);
        assert_eq!(controller.status(), ConnectionStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_initialize_requires_needs_init() {
        let memory = seeded_store().await;
        let mut controller = started(&memory, TaskScope::Shared).await;

        let err = controller.initialize().await.unwrap_err();
        assert_eq!(
            err,
            ChecklistError::InvalidTransition {
                action: "initialize",
                status: ConnectionStatus::Connected,
            }
        );
    }

    #[tokio::test]
    async fn test_initialize_with_tables_still_missing() {
        let memory = MemoryStore::without_tables();
        let mut controller = started(&memory, TaskScope::Shared).await;

        let err = controller.initialize().await.unwrap_err();
        assert!(matches!(err, ChecklistError::SchemaMissing(_)));
        assert_eq!(controller.status(), ConnectionStatus::NeedsInit);
        assert_eq!(memory.section_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_tables_need_init() {
        let memory = MemoryStore::new();
        let mut controller = started(&memory, TaskScope::Shared).await;
        assert_eq!(controller.status(), ConnectionStatus::NeedsInit);
        assert_eq!(controller.message(), Some(NO_DATA_MESSAGE));

        let outcome = controller.initialize().await.unwrap();
        assert_eq!(outcome, InitializeOutcome::Seeded);
        assert_eq!(controller.status(), ConnectionStatus::Connected);
        assert_eq!(controller.board().task_count(), 9);
    }

    #[tokio::test]
    async fn test_offline_toggle_is_local_only() {
        let mut controller = ChecklistController::new(None, TaskScope::Shared);
        controller.start().await;

        let toggled = controller.toggle("phase3", "task6").await.unwrap();
        assert!(toggled.completed);
        assert!(toggled.write.is_none());

        let entries = controller.reconciliation().await;
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].attempted);
    }

    #[tokio::test]
    async fn test_toggle_persists_when_connected() {
        let memory = seeded_store().await;
        let mut controller = started(&memory, TaskScope::Shared).await;

        let toggled = controller.toggle("phase2", "task4").await.unwrap();
        toggled.write.unwrap().await.unwrap();

        assert!(memory.task("task4").unwrap().completed);
        assert!(!controller.has_divergence().await);
    }

    #[tokio::test]
    async fn test_retry_failed_writes() {
        let memory = seeded_store().await;
        let mut controller = started(&memory, TaskScope::Shared).await;

        memory.fail_writes(Some("timeout"));
        let toggled = controller.toggle("phase1", "task3").await.unwrap();
        toggled.write.unwrap().await.unwrap();
        assert!(controller.has_divergence().await);

        memory.fail_writes(None);
        for write in controller.retry_failed_writes().await.unwrap() {
            write.await.unwrap();
        }

        assert!(memory.task("task3").unwrap().completed);
        assert!(!controller.has_divergence().await);
    }

    #[tokio::test]
    async fn test_rapid_toggles_land_in_order() {
        let memory = seeded_store().await;
        let mut controller = started(&memory, TaskScope::Shared).await;

        // the first write is slower than the one that follows it
        memory.delay_writes(Some((true, Duration::from_millis(200))));
        let first = controller.toggle("phase1", "task1").await.unwrap();
        let second = controller.toggle("phase1", "task1").await.unwrap();
        assert!(first.completed);
        assert!(!second.completed);

        second.write.unwrap().await.unwrap();
        first.write.unwrap().await.unwrap();

        assert!(!controller.board().task("phase1", "task1").unwrap().completed);
        assert!(!memory.task("task1").unwrap().completed);
        assert!(!controller.has_divergence().await);
    }

    #[tokio::test]
    async fn test_reload_waits_for_writes_in_flight() {
        let memory = seeded_store().await;
        let mut controller = started(&memory, TaskScope::Shared).await;

        memory.delay_writes(Some((true, Duration::from_millis(200))));
        let toggled = controller.toggle("phase2", "task5").await.unwrap();
        controller.load().await;

        // the reload read the store only after the write landed
        assert_eq!(controller.status(), ConnectionStatus::Connected);
        assert!(controller.board().task("phase2", "task5").unwrap().completed);
        assert!(memory.task("task5").unwrap().completed);
        assert!(!controller.has_divergence().await);
        toggled.write.unwrap().await.unwrap();
    }
}
