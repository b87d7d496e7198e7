/// Error types for Blog Service
///
/// Every failure a request can end with is an `AppError`. The HTTP body only
/// ever carries the public message of the variant; backend detail stays in the
/// server logs.
use crate::db::StoreError;
use crate::search::SearchError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// External systems the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Store,
    SearchIndex,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Store => "store",
            Backend::SearchIndex => "search_index",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    BackendUnavailable,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request parameter
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Store of record failed on the primary path
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Search index query failed
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("{backend} call timed out after {after:?}")]
    Timeout { backend: Backend, after: Duration },
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) => ErrorKind::BadInput,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Store(_) | AppError::Search(_) | AppError::Timeout { .. } => {
                ErrorKind::BackendUnavailable
            }
        }
    }

    /// Message safe to show to clients.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Store(_) => "Backend temporarily unavailable".to_string(),
            AppError::Search(_) => "Search temporarily unavailable".to_string(),
            AppError::Timeout { .. } => "Backend timed out".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Search(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        HttpResponse::build(status).json(ErrorBody {
            error: self.public_message(),
            status: status.as_u16(),
        })
    }
}
