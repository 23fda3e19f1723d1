use thiserror::Error;
use uuid::Uuid;

use crate::models::{ConnectionStatus, TableName};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChecklistError {
    #[error("Database not configured: set CHECKLIST_STORE_URL and CHECKLIST_STORE_KEY")]
    StoreNotConfigured,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Database tables missing: {}. Run the setup script first.", join_tables(.0))]
    SchemaMissing(Vec<TableName>),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Failed to save changes: {0}")]
    PersistFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task {task_id} not found in section {section_id}")]
    TaskNotFound { section_id: String, task_id: String },

    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: ConnectionStatus,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

fn join_tables(tables: &[TableName]) -> String {
    tables
        .iter()
        .map(TableName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for ChecklistError {
    fn from(err: serde_json::Error) -> Self {
        ChecklistError::QueryFailed(err.to_string())
    }
}
