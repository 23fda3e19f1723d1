use checklist_core::{ChecklistError, ChecklistResult, Task, TaskBoard, TaskScope, TaskSection};

use crate::store::StoreHandle;

/// Section and task rows as the checklist sees them.
#[derive(Clone)]
pub struct TaskRepository {
    store: StoreHandle,
}

impl TaskRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Sections in `order_index` order.
    pub async fn list_sections(&self) -> ChecklistResult<Vec<TaskSection>> {
        self.store.list_sections().await
    }

    /// Tasks of `scope` in global `order_index` order. Callers group them by
    /// `section_id` themselves.
    pub async fn list_tasks(&self, scope: TaskScope) -> ChecklistResult<Vec<Task>> {
        self.store.list_tasks(scope).await
    }

    pub async fn load_board(&self, scope: TaskScope) -> ChecklistResult<TaskBoard> {
        let sections = self.list_sections().await?;
        let tasks = self.list_tasks(scope).await?;
        Ok(TaskBoard::from_rows(sections, tasks))
    }

    /// Write one task's `completed` flag. Matching no row is a failure.
    pub async fn set_completed(&self, task_id: &str, completed: bool) -> ChecklistResult<()> {
        let updated = self.store.set_completed(task_id, completed).await?;
        if updated == 0 {
            return Err(ChecklistError::PersistFailed(format!(
                "no task with id {}",
                task_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChecklistStore, MemoryStore};
    use checklist_core::seed;

    async fn seeded() -> (MemoryStore, TaskRepository) {
        let memory = MemoryStore::new();
        memory
            .upsert_seed(&seed::seed_sections(), &seed::seed_tasks(TaskScope::Shared), None)
            .await
            .unwrap();
        let repository = TaskRepository::new(StoreHandle::memory(memory.clone()));
        (memory, repository)
    }

    #[tokio::test]
    async fn test_load_board_groups_by_section() {
        let (_memory, repository) = seeded().await;

        let board = repository.load_board(TaskScope::Shared).await.unwrap();
        assert_eq!(board, TaskBoard::default_dataset());
    }

    #[tokio::test]
    async fn test_set_completed_unknown_task() {
        let (_memory, repository) = seeded().await;

        let err = repository.set_completed("task404", true).await.unwrap_err();
        assert!(matches!(err, ChecklistError::PersistFailed(_)));
    }

    #[tokio::test]
    async fn test_set_completed_writes_through() {
        let (memory, repository) = seeded().await;

        repository.set_completed("task5", true).await.unwrap();
        assert!(memory.task("task5").unwrap().completed);
    }
}
