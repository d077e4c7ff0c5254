//! Error types for the query & data-availability core
//!
//! Centralizes the error taxonomy from the data contract so every layer
//! reports failures the same way and the HTTP boundary can map them to
//! status codes without re-deriving the mapping per handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the catalog, pool, cache, executor, planner and manager.
///
/// The `#[error]` messages are what reaches `error.message` in an HTTP error
/// body; keep them short and free of internal identifiers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing params, `start >= end`, unknown resolution, unknown symbol format.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A resource-level absence, e.g. job status for an unknown job.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection unavailable within the caller's deadline.
    #[error("pool timeout acquiring connection")]
    PoolTimeout,

    /// Store ping failed or the store rejected the query for infrastructure reasons.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed or unsupported query; should not reach production.
    #[error("query error: {0}")]
    Query(String),

    /// Row schema mismatch while decoding a result set.
    #[error("row decode error: {0}")]
    RowDecode(String),

    /// An unknown resolution id was requested.
    #[error("unknown resolution: {0}")]
    UnknownResolution(String),

    /// Catch-all, opaque to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// True for errors that are the caller's fault, not the server's.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoreError::BadRequest(_) | CoreError::NotFound(_))
    }

    /// True for errors that may succeed if retried shortly after.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::PoolTimeout | CoreError::StoreUnavailable(_))
    }
}

impl From<diesel::result::Error> for CoreError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => CoreError::NotFound("row not found".to_string()),
            other => CoreError::RowDecode(other.to_string()),
        }
    }
}

/// Wire format for `{error: {kind, message, correlation_id?}}` per spec.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, kind, retry_after) = match &self {
            CoreError::BadRequest(_) | CoreError::UnknownResolution(_) => {
                (StatusCode::BAD_REQUEST, "BadRequest", None)
            }
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", None),
            CoreError::PoolTimeout => (StatusCode::SERVICE_UNAVAILABLE, "PoolTimeout", Some(1u64)),
            CoreError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "StoreUnavailable", Some(5u64))
            }
            CoreError::Query(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Query", None),
            CoreError::RowDecode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RowDecode", None),
            CoreError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal", None),
        };

        let correlation_id = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let id = uuid::Uuid::new_v4().to_string();
            tracing::error!(correlation_id = %id, error = %self, "internal error");
            Some(id)
        } else {
            None
        };

        let body = Json(ErrorBody {
            error: ErrorPayload {
                kind,
                message: self.to_string(),
                correlation_id,
            },
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert("Retry-After", secs.to_string().parse().unwrap());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_flagged() {
        assert!(CoreError::BadRequest("x".into()).is_client_error());
        assert!(CoreError::NotFound("x".into()).is_client_error());
        assert!(!CoreError::Internal("x".into()).is_client_error());
    }

    #[test]
    fn pool_timeout_and_store_unavailable_are_retryable() {
        assert!(CoreError::PoolTimeout.is_retryable());
        assert!(CoreError::StoreUnavailable("x".into()).is_retryable());
        assert!(!CoreError::Query("x".into()).is_retryable());
    }

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let e: CoreError = diesel::result::Error::NotFound.into();
        assert!(matches!(e, CoreError::NotFound(_)));
    }
}
