use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the UI wants a task's `completed` flag to be, and whether the store
/// has been told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub task_id: String,
    pub desired: bool,
    /// A write was issued for `desired`.
    pub attempted: bool,
    /// The store acknowledged `desired`.
    pub synced: bool,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Latest desired value per task after optimistic toggles.
///
/// Entries that are not `synced` are places where the local board and the
/// store may disagree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationLog {
    entries: BTreeMap<String, ReconciliationEntry>,
}

impl ReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local toggle. `attempted` is false when no write is issued
    /// (e.g. while running on the local dataset).
    pub fn record_toggle(&mut self, task_id: &str, desired: bool, attempted: bool) {
        self.entries.insert(
            task_id.to_string(),
            ReconciliationEntry {
                task_id: task_id.to_string(),
                desired,
                attempted,
                synced: false,
                last_error: None,
                updated_at: Utc::now(),
            },
        );
    }

    /// Record the store's answer to a write of `desired`. Answers for a value
    /// that has since been toggled again are ignored.
    pub fn record_result(&mut self, task_id: &str, desired: bool, result: Result<(), String>) {
        let Some(entry) = self.entries.get_mut(task_id) else {
            return;
        };
        if entry.desired != desired {
            return;
        }

        entry.attempted = true;
        entry.updated_at = Utc::now();
        match result {
            Ok(()) => {
                entry.synced = true;
                entry.last_error = None;
            }
            Err(message) => {
                entry.synced = false;
                entry.last_error = Some(message);
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&ReconciliationEntry> {
        self.entries.get(task_id)
    }

    pub fn entries(&self) -> Vec<ReconciliationEntry> {
        self.entries.values().cloned().collect()
    }

    /// Writes that were sent and rejected.
    pub fn failed(&self) -> Vec<ReconciliationEntry> {
        self.entries
            .values()
            .filter(|entry| entry.attempted && entry.last_error.is_some())
            .cloned()
            .collect()
    }

    pub fn has_divergence(&self) -> bool {
        self.entries.values().any(|entry| !entry.synced)
    }

    /// Forget everything, e.g. after the board was reloaded from the store.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_write_is_visible() {
        let mut log = ReconciliationLog::new();
        log.record_toggle("task1", true, true);
        log.record_result("task1", true, Err("connection reset".to_string()));

        let failed = log.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].desired, true);
        assert_eq!(failed[0].last_error.as_deref(), Some("connection reset"));
        assert!(log.has_divergence());
    }

    #[test]
    fn test_success_clears_error() {
        let mut log = ReconciliationLog::new();
        log.record_toggle("task1", true, true);
        log.record_result("task1", true, Err("timeout".to_string()));
        log.record_result("task1", true, Ok(()));

        let entry = log.get("task1").unwrap();
        assert!(entry.synced);
        assert!(entry.last_error.is_none());
        assert!(!log.has_divergence());
    }

    #[test]
    fn test_stale_result_is_ignored() {
        let mut log = ReconciliationLog::new();
        log.record_toggle("task2", true, true);
        log.record_toggle("task2", false, true);

        // the write for `true` lands after the user toggled back
        log.record_result("task2", true, Ok(()));

        let entry = log.get("task2").unwrap();
        assert_eq!(entry.desired, false);
        assert!(!entry.synced);
    }

    #[test]
    fn test_local_only_toggle() {
        let mut log = ReconciliationLog::new();
        log.record_toggle("task3", true, false);

        assert!(log.failed().is_empty());
        assert!(log.has_divergence());
        assert!(!log.get("task3").unwrap().attempted);
    }
}
