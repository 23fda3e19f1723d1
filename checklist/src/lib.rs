//! Checklist - task checklist backed by an optional hosted database
//!
//! This crate provides a unified API for the checklist service.
//!
//! # Example
//!
//! ```ignore
//! use checklist::ChecklistClient;
//!
//! let client = ChecklistClient::new("http://localhost:8080");
//! let session = client.open_session().await?;
//! client.toggle(session.session_id, "phase1", "task1").await?;
//! ```

// Re-export client types
pub use checklist_client::{ChecklistClient, LocalStorage};

// Re-export server types
pub use checklist_server::controller::ChecklistController;
pub use checklist_server::AppState as Server;

// Re-export core types that external applications may need
pub use checklist_core::errors::ChecklistError;
pub use checklist_core::models::{ConnectionStatus, Task, TaskScope, TaskSection};
pub use checklist_core::board::{Progress, TaskBoard};
pub use checklist_core::ChecklistResult;
