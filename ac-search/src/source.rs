//! Trait definition for upstream source collectors.
//!
//! Each upstream (SEC EDGAR, DART, YouTube, OpenAlex, news) implements
//! [`Source`] so the research service can fan out over them uniformly.

use crate::error::FetchError;
use crate::types::SourceKind;

/// Parameters for one collection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    /// Ticker, stock code, or free-text keywords.
    pub query: String,
    /// Upper bound on returned items. Some sources apply their own
    /// per-form caps instead.
    pub max_results: usize,
    /// Restrict results to roughly the last day.
    pub daily_only: bool,
}

impl CollectRequest {
    /// A request for `query` returning at most `max_results` items.
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            daily_only: false,
        }
    }

    /// Toggle the one-day window.
    pub fn daily_only(mut self, daily_only: bool) -> Self {
        self.daily_only = daily_only;
        self
    }
}

/// A pluggable upstream collector.
///
/// Implementors own their HTTP client handle, base URLs, credentials, and
/// caches. They return every failure as a [`FetchError`]; degrading to an
/// empty result is the caller's decision.
///
/// All implementations must be `Send + Sync` so collectors can run
/// concurrently from one research request.
pub trait Source: Send + Sync {
    /// Record type this source produces.
    type Item: Send;

    /// Which upstream this collector represents.
    fn kind(&self) -> SourceKind;

    /// Fetch and parse records for the request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if credentials are missing, the query is not
    /// usable for this source, the upstream request fails, or its response
    /// cannot be parsed.
    fn collect(
        &self,
        request: &CollectRequest,
    ) -> impl std::future::Future<Output = Result<Vec<Self::Item>, FetchError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A mock source for testing trait bounds and async execution.
    struct MockSource {
        kind: SourceKind,
        items: Vec<String>,
    }

    impl Source for MockSource {
        type Item = String;

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn collect(&self, request: &CollectRequest) -> Result<Vec<String>, FetchError> {
            if self.items.is_empty() {
                return Err(FetchError::NotConfigured("mock source has no key".into()));
            }
            Ok(self
                .items
                .iter()
                .take(request.max_results)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn mock_source_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockSource>();
    }

    #[test]
    fn request_builder() {
        let request = CollectRequest::new("AAPL", 30).daily_only(true);
        assert_eq!(request.query, "AAPL");
        assert_eq!(request.max_results, 30);
        assert!(request.daily_only);
        assert!(!CollectRequest::new("x", 1).daily_only);
    }

    #[tokio::test]
    async fn mock_source_respects_max_results() {
        let source = MockSource {
            kind: SourceKind::Papers,
            items: vec!["a".into(), "b".into(), "c".into()],
        };
        let items = source
            .collect(&CollectRequest::new("q", 2))
            .await
            .expect("should succeed");
        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(source.kind(), SourceKind::Papers);
    }

    #[tokio::test]
    async fn mock_source_propagates_errors() {
        let source = MockSource {
            kind: SourceKind::YouTube,
            items: vec![],
        };
        let err = source
            .collect(&CollectRequest::new("q", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured(_)));
    }
}
