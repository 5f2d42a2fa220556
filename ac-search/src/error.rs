//! Error types for the ac-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. No API keys or sensitive data appear in
//! error messages.

/// Errors that can occur while collecting results from an upstream source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The upstream answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Failed to parse an upstream response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid collector configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The source needs credentials that are not configured.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// The query cannot be used with this source.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The upstream has no entity matching the query (unknown ticker, stock code).
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream reported an application-level error.
    #[error("API error: {0}")]
    Api(String),

    /// The upstream quota is exhausted and nothing usable is cached.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
}

/// Convenience type alias for ac-search results.
pub type Result<T> = std::result::Result<T, FetchError>;
