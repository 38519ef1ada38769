use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, provider::ProviderError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Upstream match feed could not be queried.
    #[error("match provider unavailable")]
    Provider(#[source] ProviderError),
    /// Caller is identified but not allowed to act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(message) => ServiceError::InvalidState(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        ServiceError::Provider(err)
    }
}

/// Reasons a reconciliation tick did not run to completion.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Feed fetch failed or returned non-success data; the tick is abandoned.
    #[error("match provider unavailable")]
    ProviderUnavailable(#[source] ProviderError),
    /// Another tick holds the in-process gate or the store lease.
    #[error("another reconciliation tick is in flight")]
    ConcurrentTickConflict,
    /// No store installed; the tick was not attempted.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The tick lease could not be read or written.
    #[error("failed to acquire reconciliation lease")]
    Lease(#[source] StorageError),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated caller lacks access.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Upstream dependency failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Provider(source) => AppError::BadGateway(source.to_string()),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::ConcurrentTickConflict => AppError::Conflict(err.to_string()),
            ReconcileError::ProviderUnavailable(ref source) => {
                AppError::ServiceUnavailable(format!("{err}: {source}"))
            }
            ReconcileError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ReconcileError::Lease(ref source) => {
                AppError::ServiceUnavailable(format!("{err}: {source}"))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_errors_map_to_http_statuses() {
        let conflict = AppError::from(ReconcileError::ConcurrentTickConflict).into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let provider = AppError::from(ReconcileError::ProviderUnavailable(
            ProviderError::MissingApiKey,
        ))
        .into_response();
        assert_eq!(provider.status(), StatusCode::SERVICE_UNAVAILABLE);

        let degraded = AppError::from(ReconcileError::Degraded).into_response();
        assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn storage_conflicts_surface_as_conflicts() {
        let err = AppError::from(ServiceError::from(StorageError::Conflict("dup".into())));
        assert!(matches!(err, AppError::Conflict(message) if message == "dup"));
    }
}
