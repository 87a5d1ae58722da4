use axum::http::StatusCode;
use thiserror::Error;

use crate::common::response::ApiError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Dubbing job {0} failed")]
    JobFailed(String),

    #[error("Dubbing provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Dubbing provider unreachable: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Media tool error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::JobFailed(_) => StatusCode::CONFLICT,
            AppError::Upstream { .. }
            | AppError::Provider(_)
            | AppError::Storage(_)
            | AppError::Database(_)
            | AppError::Media(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        // Schema-level checks are reported under `__all__`.
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        }
        ApiError(err.to_string(), status)
    }
}
