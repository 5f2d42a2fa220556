//! Error types for the research service.
//!
//! Handler errors render as `{"detail": "..."}` JSON with a matching status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Top-level error type for the research service.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// The request is malformed (empty query, bad limits).
    #[error("{0}")]
    BadRequest(String),

    /// The requested resource does not exist or has expired.
    #[error("{0}")]
    NotFound(String),

    /// Spreadsheet export failed.
    #[error("export error: {0}")]
    Export(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ResearchError>;

impl ResearchError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Export(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ResearchError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}
