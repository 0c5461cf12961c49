//! Orchestrator error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{api::ErrorEnvelope, ingest::BatchError};

/// Result type alias for ingestion operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Failures raised while handling a single notification
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to write metadata record {file_id}: {message}")]
    StoreWriteFailed { file_id: Uuid, message: String },

    #[error("Failed to read metadata: {0}")]
    StoreReadFailed(String),

    #[error("Failed to start job run for {file_id}: {message}")]
    DispatchFailed { file_id: Uuid, message: String },

    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] etl_common::EtlError),
}

impl IngestError {
    /// The collaborator's own message, without the orchestrator's prefix
    ///
    /// This is what ends up in a record's `error_message`.
    pub fn message(&self) -> String {
        match self {
            IngestError::StoreWriteFailed { message, .. }
            | IngestError::DispatchFailed { message, .. } => message.clone(),
            IngestError::StoreReadFailed(message) => message.clone(),
            IngestError::InvalidEvent(e) => e.to_string(),
        }
    }
}

/// HTTP-facing error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Any non-2xx makes the delivery substrate redeliver the whole batch
            AppError::Batch(_) | AppError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Batch(_) => "BATCH_FAILED",
            AppError::Ingest(_) => "INGEST_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = match &self {
            AppError::NotFound(message) | AppError::BadRequest(message) => {
                ErrorEnvelope::new(self.status(), self.code(), message.clone())
            },
            AppError::Batch(e) => {
                tracing::error!(position = e.position, key = %e.key, error = %e.error, "Batch failed");
                ErrorEnvelope::new(self.status(), self.code(), e.to_string())
                    .with_details(serde_json::to_value(&e.report).ok())
            },
            AppError::Ingest(e) => {
                tracing::error!(error = %e, "Ingestion error");
                ErrorEnvelope::new(self.status(), self.code(), e.to_string())
            },
        };

        envelope.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_context() {
        let file_id = Uuid::new_v4();
        let err = IngestError::DispatchFailed {
            file_id,
            message: "quota exceeded".to_string(),
        };

        assert_eq!(err.message(), "quota exceeded");
        assert_eq!(
            err.to_string(),
            format!("Failed to start job run for {}: quota exceeded", file_id)
        );
    }

    #[test]
    fn test_not_found_status() {
        let response = AppError::NotFound("no record".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_ingest_errors_are_server_errors() {
        let err = AppError::from(IngestError::StoreReadFailed("table unavailable".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
