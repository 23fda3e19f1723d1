use std::fmt::{Display, Formatter};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checklist_core::{ChecklistError, ErrorResponse};
use thiserror::Error;
use tracing::{error, warn};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Checklist(#[from] ChecklistError),

    #[error("{0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("{0}")]
    ApiError(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("argon2 Library Error: {0}")]
    HashingError(argon2::password_hash::Error),
}

impl From<argon2::password_hash::Error> for ServerError {
    fn from(error: argon2::password_hash::Error) -> Self {
        ServerError::HashingError(error)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalServerError(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::InternalServerError(message)
            | ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::BadGateway(message)
            | ApiError::ServiceUnavailable(message) => message,
        }
    }
}

impl From<&ChecklistError> for ApiError {
    fn from(err: &ChecklistError) -> Self {
        let message = err.to_string();
        match err {
            ChecklistError::StoreNotConfigured => ApiError::ServiceUnavailable(message),
            ChecklistError::DuplicateUsername
            | ChecklistError::SchemaMissing(_)
            | ChecklistError::InvalidTransition { .. } => ApiError::Conflict(message),
            ChecklistError::InvalidCredentials => ApiError::Unauthorized(message),
            ChecklistError::QueryFailed(_) | ChecklistError::PersistFailed(_) => {
                ApiError::BadGateway(message)
            }
            ChecklistError::InvalidInput(_) => ApiError::BadRequest(message),
            ChecklistError::TaskNotFound { .. } | ChecklistError::SessionNotFound(_) => {
                ApiError::NotFound(message)
            }
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Status={}, {}", self.status().as_u16(), self.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("{}", self);
        let body = ErrorResponse {
            message: self.message().to_string(),
        };
        (self.status(), axum::Json(body)).into_response()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Checklist(e) => ApiError::from(&e).into_response(),
            ServerError::ApiError(e) => e.into_response(),
            other => {
                error!(error = %other, "Unhandled server error");
                ApiError::internal("Unexpected Error").into_response()
            }
        }
    }
}
