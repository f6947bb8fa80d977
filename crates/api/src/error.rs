//! API error type and its envelope mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use projections::ProjectionError;
use saga::RebookError;

use crate::envelope::Envelope;

/// Errors surfaced by handlers. Every variant renders as a failure envelope.
#[derive(Debug)]
pub enum ApiError {
    /// The request never reached the saga.
    Malformed(String),
    /// The saga ended with a named failure, or failed internally.
    Rebook(RebookError),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Malformed(_) => "MALFORMED_INPUT",
            ApiError::Rebook(err) => err.code(),
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// 400 for malformed input, 500 for internal faults, 200 for saga outcomes.
    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            "MALFORMED_INPUT" => StatusCode::BAD_REQUEST,
            "INTERNAL" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Malformed(msg) => f.write_str(msg),
            ApiError::Rebook(err) => write!(f, "{err}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
        }
        (status, Json(Envelope::failed(self.code(), self.to_string()))).into_response()
    }
}

impl From<RebookError> for ApiError {
    fn from(err: RebookError) -> Self {
        ApiError::Rebook(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Malformed(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
