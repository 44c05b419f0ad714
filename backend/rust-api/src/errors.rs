use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

/// Domain errors returned by the service layer.
///
/// Every variant maps to a client-visible rejection except `Storage` and
/// `Other`, which surface as infrastructure faults. Service methods either
/// apply a transition fully or return one of these with nothing written.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing required fields on input.
    #[error("{0}")]
    Validation(String),

    /// Attempt to progress a topic whose predecessor is not completed.
    #[error("previous topic not completed")]
    SequenceViolation,

    /// Referenced document does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Structurally invalid request, rejected before any state mutation.
    #[error("{0}")]
    InvalidInput(String),

    /// Bad credentials or a deactivated account.
    #[error("{0}")]
    Unauthorized(String),

    /// Certificate code generation exhausted its retry limit.
    #[error("certificate code generation exhausted all attempts")]
    ResourceExhausted,

    /// Storage-layer failure, distinct from the domain errors above.
    /// The core never retries these (retry policy belongs to the driver).
    #[error("storage error: {0}")]
    Storage(#[from] mongodb::error::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// HTTP-level error used by handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Validation(_)
            | ServiceError::InvalidInput(_)
            | ServiceError::SequenceViolation => ApiError::BadRequest(message),
            ServiceError::NotFound(_) => ApiError::NotFound(message),
            ServiceError::Unauthorized(_) => ApiError::Unauthorized(message),
            ServiceError::ResourceExhausted => ApiError::Internal(message),
            ServiceError::Storage(e) => {
                tracing::error!("Storage failure: {:?}", e);
                ApiError::Internal("storage error".to_string())
            }
            ServiceError::Other(e) => {
                tracing::error!("Internal failure: {:?}", e);
                ApiError::Internal(message)
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let json_response = serde_json::json!({
            "success": false,
            "message": message,
        });
        (status, Json(json_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_violation_maps_to_bad_request() {
        let api: ApiError = ServiceError::SequenceViolation.into();
        assert!(matches!(api, ApiError::BadRequest(_)));
    }

    #[test]
    fn not_found_keeps_entity_name() {
        let api: ApiError = ServiceError::NotFound("certificate").into();
        match api {
            ApiError::NotFound(msg) => assert_eq!(msg, "certificate not found"),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }
}
