use checklist_core::ChecklistError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checklist error: {0}")]
    Checklist(#[from] ChecklistError),

    /// Non-success response; `message` is the server's error body.
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
