//! NewsAPI.org `everything` search, English-language articles.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use super::{cache_key, sort_newest_first, window};
use crate::cache::{Clock, TtlCache};
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;
use crate::types::{NewsArticle, NewsProvider};
use crate::url_normalize::canonical_url;

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<RawSource>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    #[serde(default)]
    name: Option<String>,
}

/// NewsAPI provider. Without `NEWS_API_KEY` every search yields nothing.
pub struct NewsApiProvider {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<String, Vec<NewsArticle>>,
}

impl NewsApiProvider {
    pub fn new(client: reqwest::Client, config: &SourceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            base: config.endpoints.newsapi.clone(),
            api_key: config.keys.newsapi.clone(),
            cache: TtlCache::new(config.news_cache_ttl_seconds, clock.clone()),
            clock,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search articles published within the window, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails or NewsAPI reports an error.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        daily_only: bool,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let cache_key = cache_key(NewsProvider::NewsApi, query, max_results, daily_only);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let (from, to) = window(self.clock.now(), daily_only);
        let from = from.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let to = to.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let page_size = max_results.min(MAX_PAGE_SIZE).to_string();

        let request = self
            .client
            .get(format!("{}/v2/everything", self.base))
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ])
            .header("X-Api-Key", key);

        let response: EverythingResponse = http::get_json(request, "NewsAPI").await?;
        if response.status == "error" {
            return Err(FetchError::Api(format!(
                "NewsAPI: {}",
                response.message.unwrap_or_default()
            )));
        }

        let articles = parse_articles(response.articles, max_results);
        tracing::debug!(count = articles.len(), provider = "newsapi", "news collected");
        self.cache.insert(cache_key, articles.clone());
        Ok(articles)
    }
}

fn parse_articles(raw: Vec<RawArticle>, max_results: usize) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    let mut articles = Vec::new();

    for article in raw {
        let url = article.url.as_deref().unwrap_or_default().trim().to_owned();
        if url.is_empty() {
            continue;
        }
        let canonical = canonical_url(&url);
        if canonical.is_empty() || !seen.insert(canonical) {
            continue;
        }
        articles.push(NewsArticle {
            title: article.title.unwrap_or_default().trim().to_owned(),
            url,
            published_at: article.published_at.unwrap_or_default().trim().to_owned(),
            source_name: article
                .source
                .and_then(|s| s.name)
                .unwrap_or_default(),
            provider: NewsProvider::NewsApi,
        });
        if articles.len() >= max_results {
            break;
        }
    }

    sort_newest_first(&mut articles);
    articles
}
