use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A registered account. The password hash is never part of this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSection {
    pub id: String,
    pub title: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub completed: bool,
    pub order_index: i32,
}

/// A section together with its tasks, both in `order_index` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSectionWithTasks {
    #[serde(flatten)]
    pub section: TaskSection,
    pub tasks: Vec<Task>,
}

impl TaskSectionWithTasks {
    pub fn id(&self) -> &str {
        &self.section.id
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }
}

/// Which task rows a checklist reads and seeds.
///
/// Shared rows have no owner and form the anonymous checklist. Owned rows
/// are created for a user at registration and only ever listed for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum TaskScope {
    Shared,
    Owner(i64),
}

impl TaskScope {
    pub fn owner(&self) -> Option<i64> {
        match self {
            TaskScope::Shared => None,
            TaskScope::Owner(user_id) => Some(*user_id),
        }
    }

    /// Row id for a seed task within this scope, e.g. `task3` or `task3_user7`.
    pub fn task_id(&self, base: &str) -> String {
        match self {
            TaskScope::Shared => base.to_string(),
            TaskScope::Owner(user_id) => format!("{}_user{}", base, user_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ConnectionStatus {
    NotConfigured,
    Connecting,
    Connected,
    NeedsInit,
    Error,
    Initializing,
}

impl ConnectionStatus {
    /// Short human-readable description of the status.
    pub fn describe(&self) -> &'static str {
        match self {
            ConnectionStatus::NotConfigured => "Cloud database not configured, using local data",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected to cloud data",
            ConnectionStatus::NeedsInit => "Database needs initialization",
            ConnectionStatus::Error => "Connection failed, using local data",
            ConnectionStatus::Initializing => "Inserting initial data...",
        }
    }
}

/// Tables the checklist needs before it can read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TableName {
    TaskSections,
    Tasks,
}

impl TableName {
    pub const REQUIRED: [TableName; 2] = [TableName::TaskSections, TableName::Tasks];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::TaskSections => "task_sections",
            TableName::Tasks => "tasks",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_connection_status_strings() {
        assert_eq!(ConnectionStatus::NeedsInit.to_string(), "needs-init");
        assert_eq!(ConnectionStatus::from_str("not-configured").unwrap(), ConnectionStatus::NotConfigured);
        assert_eq!(
            serde_json::to_value(ConnectionStatus::Connected).unwrap(),
            serde_json::json!("connected")
        );
    }

    #[test]
    fn test_table_names_match_schema() {
        assert_eq!(TableName::TaskSections.to_string(), TableName::TaskSections.as_str());
        assert_eq!(TableName::Tasks.to_string(), "tasks");
    }

    #[test]
    fn test_scope_task_ids() {
        assert_eq!(TaskScope::Shared.task_id("task4"), "task4");
        assert_eq!(TaskScope::Owner(12).task_id("task4"), "task4_user12");
        assert_eq!(TaskScope::Owner(12).owner(), Some(12));
        assert_eq!(TaskScope::Shared.owner(), None);
    }

    #[test]
    fn test_section_with_tasks_serializes_flat() {
        let section = TaskSectionWithTasks {
            section: TaskSection {
                id: "phase1".to_string(),
                title: "Phase 1".to_string(),
                order_index: 1,
            },
            tasks: vec![],
        };

        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["id"], "phase1");
        assert_eq!(value["order_index"], 1);
        assert!(value["tasks"].as_array().unwrap().is_empty());
    }
}
