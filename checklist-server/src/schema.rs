use std::collections::{BTreeMap, BTreeSet};

use checklist_core::{ChecklistResult, TableName};

use crate::store::StoreHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct TableCheck {
    pub all_present: bool,
    pub missing: BTreeSet<TableName>,
    /// Error text of each failed probe, for logging.
    pub details: BTreeMap<TableName, String>,
}

impl TableCheck {
    pub fn missing_names(&self) -> Vec<TableName> {
        self.missing.iter().copied().collect()
    }
}

/// Decides whether the store has the tables the checklist reads.
///
/// Any probe error counts as "missing": a permission problem and an absent
/// table look the same from here.
#[derive(Clone)]
pub struct SchemaChecker {
    store: StoreHandle,
}

impl SchemaChecker {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn check_tables(&self) -> TableCheck {
        let mut missing = BTreeSet::new();
        let mut details = BTreeMap::new();

        for table in TableName::REQUIRED {
            if let Err(e) = self.store.probe(table).await {
                tracing::debug!(table = %table, error = %e, "Table probe failed");
                missing.insert(table);
                details.insert(table, e.to_string());
            }
        }

        TableCheck {
            all_present: missing.is_empty(),
            missing,
            details,
        }
    }

    /// Lightweight connectivity check used by "test connection".
    pub async fn probe_connection(&self) -> ChecklistResult<()> {
        self.store.probe(TableName::TaskSections).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_all_present() {
        let checker = SchemaChecker::new(StoreHandle::memory(MemoryStore::new()));
        let check = checker.check_tables().await;

        assert!(check.all_present);
        assert!(check.missing.is_empty());
    }

    #[tokio::test]
    async fn test_one_table_missing() {
        let memory = MemoryStore::new();
        memory.drop_table(TableName::Tasks);
        let checker = SchemaChecker::new(StoreHandle::memory(memory));

        let check = checker.check_tables().await;
        assert!(!check.all_present);
        assert_eq!(check.missing_names(), vec![TableName::Tasks]);
        assert!(check.details[&TableName::Tasks].contains("does not exist"));
    }

    #[tokio::test]
    async fn test_any_error_counts_as_missing() {
        let memory = MemoryStore::new();
        memory.fail_reads(Some("permission denied for table task_sections"));
        let checker = SchemaChecker::new(StoreHandle::memory(memory));

        let check = checker.check_tables().await;
        assert_eq!(check.missing.len(), 2);
        assert!(checker.probe_connection().await.is_err());
    }
}
