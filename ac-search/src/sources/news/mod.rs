//! News search across NewsAPI and NAVER with provider fallback.
//!
//! Queries containing Hangul go to NAVER first; everything else goes to
//! NewsAPI first. The other provider is consulted only when the primary
//! yields nothing.

pub mod naver;
pub mod newsapi;

pub use naver::NaverProvider;
pub use newsapi::NewsApiProvider;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::cache::Clock;
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::source::{CollectRequest, Source};
use crate::types::{NewsArticle, NewsProvider, SourceKind};

const DEFAULT_WINDOW_DAYS: i64 = 30;

/// News collector combining both providers.
pub struct NewsSource {
    newsapi: NewsApiProvider,
    naver: NaverProvider,
}

impl NewsSource {
    pub fn new(client: reqwest::Client, config: &SourceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            newsapi: NewsApiProvider::new(client.clone(), config, clock.clone()),
            naver: NaverProvider::new(client, config, clock),
        }
    }

    /// True if at least one provider has credentials.
    pub fn is_configured(&self) -> bool {
        self.newsapi.is_configured() || self.naver.is_configured()
    }

    async fn search_with(
        &self,
        provider: NewsProvider,
        request: &CollectRequest,
        query: &str,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        match provider {
            NewsProvider::NewsApi => {
                self.newsapi
                    .search(query, request.max_results, request.daily_only)
                    .await
            }
            NewsProvider::Naver => {
                self.naver
                    .search(query, request.max_results, request.daily_only)
                    .await
            }
        }
    }
}

impl Source for NewsSource {
    type Item = NewsArticle;

    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn collect(&self, request: &CollectRequest) -> Result<Vec<NewsArticle>, FetchError> {
        let query = request.query.trim();
        if query.is_empty() || request.max_results == 0 {
            return Ok(Vec::new());
        }
        if !self.is_configured() {
            return Err(FetchError::NotConfigured(
                "set NEWS_API_KEY or NAVER_CLIENT_ID/NAVER_CLIENT_SECRET".into(),
            ));
        }

        let (primary, fallback) = provider_order(query);
        let primary_err = match self.search_with(primary, request, query).await {
            Ok(articles) if !articles.is_empty() => return Ok(articles),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(provider = %primary, error = %err, "primary news provider failed");
                Some(err)
            }
        };

        tracing::debug!(provider = %fallback, "falling back to secondary news provider");
        match (self.search_with(fallback, request, query).await, primary_err) {
            (Ok(articles), _) if !articles.is_empty() => Ok(articles),
            (_, Some(err)) => Err(err),
            (result, None) => result,
        }
    }
}

/// Primary and fallback provider for a query.
pub fn provider_order(query: &str) -> (NewsProvider, NewsProvider) {
    if has_hangul(query) {
        (NewsProvider::Naver, NewsProvider::NewsApi)
    } else {
        (NewsProvider::NewsApi, NewsProvider::Naver)
    }
}

/// True if any character is a Hangul syllable (U+AC00..=U+D7A3).
pub fn has_hangul(text: &str) -> bool {
    text.chars().any(|c| ('\u{AC00}'..='\u{D7A3}').contains(&c))
}

/// Search window `[now - 1 day, now]` or `[now - 30 days, now]`.
pub(crate) fn window(now: DateTime<Utc>, daily_only: bool) -> (DateTime<Utc>, DateTime<Utc>) {
    let days = if daily_only { 1 } else { DEFAULT_WINDOW_DAYS };
    (now - Duration::days(days), now)
}

pub(crate) fn cache_key(
    provider: NewsProvider,
    query: &str,
    max_results: usize,
    daily_only: bool,
) -> String {
    format!(
        "news:{provider}:{}:max={max_results}:daily={}",
        query.trim().to_lowercase(),
        u8::from(daily_only)
    )
}

/// Stable sort by publication time, newest first. Unparseable timestamps sort last.
pub(crate) fn sort_newest_first(articles: &mut [NewsArticle]) {
    let key = |a: &NewsArticle| {
        DateTime::parse_from_rfc3339(&a.published_at)
            .or_else(|_| DateTime::parse_from_rfc2822(&a.published_at))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    };
    articles.sort_by(|a, b| key(b).cmp(&key(a)));
}
