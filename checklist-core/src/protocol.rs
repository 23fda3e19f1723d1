use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Progress, TaskBoard};
use crate::errors::ChecklistError;
use crate::models::{ConnectionStatus, Task, User};
use crate::reconcile::ReconciliationEntry;
use crate::seed::GuideStep;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    /// Returns the trimmed username when both fields are acceptable.
    pub fn validate(&self) -> Result<String, ChecklistError> {
        let username = self.username.trim();
        if username.is_empty() || self.password.trim().is_empty() {
            return Err(ChecklistError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(ChecklistError::InvalidInput(format!(
                "username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ChecklistError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(username.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<String, ChecklistError> {
        let username = self.username.trim();
        if username.is_empty() || self.password.trim().is_empty() {
            return Err(ChecklistError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }
        Ok(username.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub session_id: Uuid,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub order_index: i32,
    pub progress: Progress,
    pub tasks: Vec<Task>,
}

/// Everything a client needs to render one checklist session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub status: ConnectionStatus,
    pub status_text: String,
    /// The current error or hint, if any.
    pub message: Option<String>,
    pub progress: Progress,
    pub all_completed: bool,
    pub sections: Vec<SectionView>,
}

impl BoardView {
    pub fn new(board: &TaskBoard, status: ConnectionStatus, message: Option<String>) -> Self {
        let sections = board
            .sections
            .iter()
            .map(|section| SectionView {
                id: section.section.id.clone(),
                title: section.section.title.clone(),
                order_index: section.section.order_index,
                progress: Progress::new(section.completed_count(), section.tasks.len()),
                tasks: section.tasks.clone(),
            })
            .collect();

        let progress = board.progress();
        Self {
            status,
            status_text: status.describe().to_string(),
            message,
            progress,
            all_completed: progress.is_all_completed(),
            sections,
        }
    }

    pub fn task_count(&self) -> usize {
        self.sections.iter().map(|section| section.tasks.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializeOutcome {
    Seeded,
    AlreadyInitialized,
}

impl InitializeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            InitializeOutcome::Seeded => "Initial data inserted",
            InitializeOutcome::AlreadyInitialized => {
                "Database already contains data, nothing to initialize"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub outcome: InitializeOutcome,
    pub message: String,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub task_id: String,
    pub completed: bool,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResponse {
    pub entries: Vec<ReconciliationEntry>,
    pub divergent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideStepView {
    pub number: u8,
    pub title: String,
    pub instructions: Vec<String>,
    pub copyable: Vec<String>,
}

impl From<&GuideStep> for GuideStepView {
    fn from(step: &GuideStep) -> Self {
        Self {
            number: step.number,
            title: step.title.to_string(),
            instructions: step.instructions.iter().map(|line| line.to_string()).collect(),
            copyable: step.copyable.iter().map(|line| line.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
