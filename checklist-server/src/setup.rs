use checklist_core::{seed, ChecklistError, ChecklistResult, InitializeOutcome, TaskScope};

use crate::schema::SchemaChecker;
use crate::store::StoreHandle;

/// Writes the seed rows into an existing schema. Tables themselves only come
/// from [`seed::SETUP_SCRIPT`].
#[derive(Clone)]
pub struct Initializer {
    store: StoreHandle,
    checker: SchemaChecker,
}

impl Initializer {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            checker: SchemaChecker::new(store.clone()),
            store,
        }
    }

    /// Seed sections and the tasks of `scope`.
    ///
    /// Refuses to write when tables are missing and does nothing when the
    /// scope already has data. Sections and tasks go in as one upsert batch,
    /// so repeating this never duplicates rows.
    pub async fn insert_initial_data(&self, scope: TaskScope) -> ChecklistResult<InitializeOutcome> {
        let check = self.checker.check_tables().await;
        if !check.all_present {
            return Err(ChecklistError::SchemaMissing(check.missing_names()));
        }

        if self.store.has_sections().await? && self.store.count_tasks(scope).await? > 0 {
            tracing::info!(?scope, "Seed data already present");
            return Ok(InitializeOutcome::AlreadyInitialized);
        }

        let sections = seed::seed_sections();
        let tasks = seed::seed_tasks(scope);
        self.store.upsert_seed(&sections, &tasks, scope.owner()).await?;

        tracing::info!(
            ?scope,
            sections = sections.len(),
            tasks = tasks.len(),
            "Inserted initial data"
        );
        Ok(InitializeOutcome::Seeded)
    }
}
