use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use praxis_core::CoreError;
use praxis_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetail {
    /// Stable machine-readable code: invalid | unauthorized | forbidden |
    /// not_found | conflict | internal
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }
}

/// High-level API errors mapped to HTTP responses.
///
/// Status mapping follows the clinic error taxonomy: invalid input and
/// conflicts are both 400 (a conflict is a request problem, not a server
/// one), denials are a generic 403, store failures are 500. Audit write
/// failures never appear here at all; they are swallowed at the call site.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The generic denial response. Deliberately does not say which
    /// ownership condition failed, so callers cannot probe record
    /// ownership through error messages.
    pub fn access_denied() -> Self {
        Self::Forbidden("access to this record is denied".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest(msg) => ErrorBody::new("invalid", msg),
            ApiError::Unauthorized(msg) => ErrorBody::new("unauthorized", msg),
            ApiError::Forbidden(msg) => ErrorBody::new("forbidden", msg),
            ApiError::NotFound(msg) => ErrorBody::new("not_found", msg),
            ApiError::Conflict(msg) => ErrorBody::new("conflict", msg),
            ApiError::Internal(msg) => ErrorBody::new("internal", msg),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { resource, id } => {
                ApiError::NotFound(format!("{resource} {id} not found"))
            }
            StorageError::VersionConflict { .. } => {
                ApiError::Conflict("the record was modified by another request".to_string())
            }
            StorageError::AlreadyOwner { .. } => {
                ApiError::Conflict("patient is already assigned to this clinician".to_string())
            }
            StorageError::TransactionError { .. } | StorageError::Internal { .. } => {
                ApiError::Internal("storage failure".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| {
            // Fallback minimal body if serialization fails
            b"{\"error\":{\"code\":\"internal\",\"message\":\"serialization failure\"}}".to_vec()
        });

        let mut builder = axum::http::Response::builder().status(status);
        builder = builder.header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        builder
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| {
                axum::http::Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    )
                    .body(axum::body::Body::from("{}"))
                    .expect("build fallback response")
            })
    }
}
