//! Shared HTTP client and JSON request helpers for upstream APIs.
//!
//! Provides a configured [`reqwest::Client`] with a fixed User-Agent,
//! compression, and a timeout, plus helpers that turn transport failures,
//! non-success statuses, and malformed bodies into [`FetchError`] values.

use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;

use crate::config::SourceConfig;
use crate::error::FetchError;

/// Longest response body kept in [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 2048;

/// Build a [`reqwest::Client`] configured for upstream API calls.
///
/// The client has:
/// - Timeout from config
/// - The configured User-Agent (SEC EDGAR requires a descriptive one)
/// - Brotli and gzip decompression
///
/// # Errors
///
/// Returns [`FetchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SourceConfig) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Send a request and return the response if its status is a success.
///
/// Non-success responses become [`FetchError::Status`] with a truncated body,
/// so callers can inspect quota errors and similar payloads.
pub async fn send(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<reqwest::Response, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::Http(format!("{label} request failed: {}", redact(&e))))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        status: status.as_u16(),
        body: truncate(&body, MAX_ERROR_BODY),
    })
}

/// Send a request and deserialise a JSON body.
pub async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<T, FetchError> {
    let response = send(request, label).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Http(format!("{label} response read failed: {}", redact(&e))))?;
    tracing::trace!(bytes = bytes.len(), label, "response received");
    serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::Parse(format!("{label} response is not valid JSON: {e}")))
}

/// Send a request and return the raw body bytes.
pub async fn get_bytes(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<Vec<u8>, FetchError> {
    let response = send(request, label).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Http(format!("{label} response read failed: {}", redact(&e))))?;
    Ok(bytes.to_vec())
}

/// Sleep for a random duration within `range` milliseconds.
pub async fn jitter(range: (u64, u64)) {
    let (min, max) = range;
    if max == 0 {
        return;
    }
    let delay = if min >= max {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// Strip the URL (and so any `apiKey` query parameter) from a reqwest error.
fn redact(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_decode() {
        "decode failed"
    } else {
        "transport error"
    };
    let mut message = err.to_string();
    if let Some(url) = err.url() {
        message = message.replace(url.as_str(), "<url>");
    }
    format!("{kind}: {message}")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_with_default_config() {
        let config = SourceConfig::default();
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn truncate_short_text_unchanged() {
        assert_eq!(truncate("quota", 10), "quota");
    }

    #[test]
    fn truncate_long_text_on_char_boundary() {
        let text = "한국어 텍스트입니다";
        let out = truncate(text, 3);
        assert_eq!(out, "한국어…");
    }

    #[tokio::test]
    async fn jitter_zero_range_returns_immediately() {
        let start = std::time::Instant::now();
        jitter((0, 0)).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
