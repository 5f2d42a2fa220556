//! NAVER news search, used first for Korean queries.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use scraper::Html;
use serde::Deserialize;

use super::{cache_key, sort_newest_first, window};
use crate::cache::{Clock, TtlCache};
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;
use crate::screener::allowlist::host_of;
use crate::types::{NewsArticle, NewsProvider};
use crate::url_normalize::canonical_url;

const MAX_DISPLAY: usize = 100;

#[derive(Debug, Default, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    originallink: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
}

/// NAVER provider. Needs both the client id and secret.
pub struct NaverProvider {
    client: reqwest::Client,
    base: String,
    credentials: Option<(String, String)>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<String, Vec<NewsArticle>>,
}

impl NaverProvider {
    pub fn new(client: reqwest::Client, config: &SourceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            base: config.endpoints.naver.clone(),
            credentials: config
                .keys
                .naver()
                .map(|(id, secret)| (id.to_owned(), secret.to_owned())),
            cache: TtlCache::new(config.news_cache_ttl_seconds, clock.clone()),
            clock,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Search by relevance, keep items inside the window, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        daily_only: bool,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        let Some((id, secret)) = &self.credentials else {
            return Ok(Vec::new());
        };
        let cache_key = cache_key(NewsProvider::Naver, query, max_results, daily_only);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let display = max_results.min(MAX_DISPLAY).to_string();
        let request = self
            .client
            .get(format!("{}/v1/search/news.json", self.base))
            .query(&[
                ("query", query),
                ("display", display.as_str()),
                ("start", "1"),
                ("sort", "sim"),
            ])
            .header("X-Naver-Client-Id", id.as_str())
            .header("X-Naver-Client-Secret", secret.as_str());

        let response: NewsResponse = http::get_json(request, "NAVER news").await?;
        let (from, to) = window(self.clock.now(), daily_only);
        let articles = parse_items(response.items, max_results, from, to);
        tracing::debug!(count = articles.len(), provider = "naver", "news collected");
        self.cache.insert(cache_key, articles.clone());
        Ok(articles)
    }
}

fn parse_items(
    raw: Vec<RawItem>,
    max_results: usize,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    let mut articles = Vec::new();

    for item in raw {
        let pub_raw = item.pub_date.as_deref().unwrap_or_default().trim().to_owned();
        if pub_raw.is_empty() {
            continue;
        }
        let published = DateTime::parse_from_rfc2822(&pub_raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        if published.is_some_and(|dt| dt < from || dt > to) {
            continue;
        }

        let url = item.link.as_deref().unwrap_or_default().trim().to_owned();
        if url.is_empty() {
            continue;
        }
        let canonical = canonical_url(&url);
        if canonical.is_empty() || !seen.insert(canonical) {
            continue;
        }

        let original = item.originallink.as_deref().unwrap_or_default().trim();
        let source_name = host_of(original)
            .or_else(|| host_of(&url))
            .unwrap_or_default();

        articles.push(NewsArticle {
            title: strip_markup(item.title.as_deref().unwrap_or_default()),
            url,
            published_at: published
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or(pub_raw),
            source_name,
            provider: NewsProvider::Naver,
        });
        if articles.len() >= max_results {
            break;
        }
    }

    sort_newest_first(&mut articles);
    articles
}

/// Drop `<b>` highlighting and decode entities in NAVER titles.
fn strip_markup(title: &str) -> String {
    let fragment = Html::parse_fragment(title);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_owned()
}
