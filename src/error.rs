//! Request-level errors for the analysis endpoints.
//!
//! Oracle failures never show up here: they degrade inside the oracle adapter.
//! What remains are input errors, "nothing to analyze" conditions, and defects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Errors are `Clone` so a single-flight leader can hand the same failure to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("Target '{0}' is not a recognizable video or channel")]
    InvalidTarget(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream collaborator failed: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalyzeError::InvalidTarget(_) | AnalyzeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalyzeError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AnalyzeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "analysis request failed");
        }
        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_codes() {
        assert_eq!(
            AnalyzeError::InvalidTarget("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AnalyzeError::BadRequest("empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AnalyzeError::NotFound("none".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AnalyzeError::Upstream("boom".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AnalyzeError::Internal("bug".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
