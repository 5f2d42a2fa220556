//! YouTube Data API v3: recent long-form videos for a keyword.
//!
//! `search.list` is the quota driver, so pages are kept small and results
//! are cached for a day. When the daily quota is exhausted a stale cached
//! result is served instead of failing.

use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;

use crate::cache::{Clock, TtlCache};
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;
use crate::source::{CollectRequest, Source};
use crate::types::{SourceKind, Video};

const MAX_PER_PAGE: usize = 20;
/// Guard against pages that keep returning a token but no videos.
const MAX_PAGES: usize = 10;
const SEARCH_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: ItemId,
    #[serde(default)]
    snippet: ItemSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSnippet {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

/// YouTube collector. Requires `YOUTUBE_API_KEY`.
pub struct YouTubeSource {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<String, Vec<Video>>,
}

impl YouTubeSource {
    pub fn new(client: reqwest::Client, config: &SourceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            base: config.endpoints.youtube.clone(),
            api_key: config.keys.youtube.clone(),
            cache: TtlCache::new(config.youtube_cache_ttl_seconds, clock.clone()),
            clock,
        }
    }

    async fn search(
        &self,
        key: &str,
        query: &str,
        max_results: usize,
        daily_only: bool,
    ) -> Result<Vec<Video>, FetchError> {
        let window = if daily_only {
            Duration::days(1)
        } else {
            Duration::days(SEARCH_WINDOW_DAYS)
        };
        let published_after = (self.clock.now() - window)
            .format("%Y-%m-%dT00:00:00Z")
            .to_string();
        let per_page = max_results.min(MAX_PER_PAGE).to_string();
        let url = format!("{}/youtube/v3/search", self.base);

        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = self.client.get(&url).query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("order", "date"),
                ("publishedAfter", published_after.as_str()),
                ("videoDuration", "long"),
                ("maxResults", per_page.as_str()),
                ("key", key),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: SearchResponse = http::get_json(request, "YouTube search").await?;
            videos.extend(parse_items(page.items));
            if videos.len() >= max_results {
                break;
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        videos.truncate(max_results);
        Ok(videos)
    }
}

impl Source for YouTubeSource {
    type Item = Video;

    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn collect(&self, request: &CollectRequest) -> Result<Vec<Video>, FetchError> {
        let query = request.query.trim();
        if query.is_empty() || request.max_results == 0 {
            return Ok(Vec::new());
        }
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::NotConfigured("YOUTUBE_API_KEY is not set".into()))?;

        let cache_key = cache_key(query, request.max_results, request.daily_only);
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::trace!(count = cached.len(), "YouTube cache hit");
            return Ok(cached);
        }

        match self
            .search(key, query, request.max_results, request.daily_only)
            .await
        {
            Ok(videos) => {
                tracing::debug!(count = videos.len(), "YouTube videos collected");
                self.cache.insert(cache_key, videos.clone());
                Ok(videos)
            }
            Err(err) if is_quota_exceeded(&err) => match self.cache.get_stale(&cache_key) {
                Some(stale) => {
                    tracing::warn!(count = stale.len(), "YouTube quota exceeded, serving stale cache");
                    Ok(stale)
                }
                None => Err(FetchError::QuotaExceeded(
                    "YouTube daily quota exhausted".into(),
                )),
            },
            Err(err) => Err(err),
        }
    }
}

fn cache_key(query: &str, max_results: usize, daily_only: bool) -> String {
    format!(
        "yt:{}:max={max_results}:daily={}",
        query.to_lowercase(),
        u8::from(daily_only)
    )
}

fn parse_items(items: Vec<SearchItem>) -> Vec<Video> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.video_id?.trim().to_owned();
            if id.is_empty() {
                return None;
            }
            Some(Video {
                title: item.snippet.title.unwrap_or_default(),
                url: format!("https://www.youtube.com/watch?v={id}"),
                duration_minutes: None,
                published_at: item.snippet.published_at.unwrap_or_default(),
            })
        })
        .collect()
}

/// A 403 whose body names one of the quota reasons.
fn is_quota_exceeded(err: &FetchError) -> bool {
    matches!(
        err,
        FetchError::Status { status: 403, body }
            if body.contains("quotaExceeded") || body.contains("dailyLimitExceeded")
    )
}
