//! Collector configuration with sensible defaults.
//!
//! [`SourceConfig`] controls timeouts, the User-Agent sent upstream, paging
//! delays, cache lifetimes, API credentials, and base URLs. Base URLs are
//! configurable so collectors can be pointed at mock servers.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Configuration shared by every source collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Timeout for the DART corp-code archive, which is several megabytes.
    pub bulk_timeout_seconds: u64,
    /// User-Agent sent to every upstream. SEC EDGAR rejects anonymous agents.
    pub user_agent: String,
    /// Random delay range in milliseconds `(min, max)` between paged requests.
    pub request_delay_ms: (u64, u64),
    /// How long YouTube results stay cached, in seconds.
    pub youtube_cache_ttl_seconds: u64,
    /// How long news results stay cached, in seconds.
    pub news_cache_ttl_seconds: u64,
    /// How long ticker/corp-code lookups stay cached, in seconds.
    pub lookup_cache_ttl_seconds: u64,
    /// Upstream base URLs.
    pub endpoints: Endpoints,
    /// Upstream credentials. Never serialised; read from the environment.
    #[serde(skip)]
    pub keys: ApiKeys,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 25,
            bulk_timeout_seconds: 60,
            user_agent: "AC-research API (contact: research@example.com)".to_owned(),
            request_delay_ms: (150, 250),
            youtube_cache_ttl_seconds: 24 * 60 * 60,
            news_cache_ttl_seconds: 60 * 60,
            lookup_cache_ttl_seconds: 24 * 60 * 60,
            endpoints: Endpoints::default(),
            keys: ApiKeys::default(),
        }
    }
}

impl SourceConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` and `bulk_timeout_seconds` must be greater than 0
    /// - `user_agent` must not be empty
    /// - `request_delay_ms.0` must be <= `request_delay_ms.1`
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout_seconds == 0 || self.bulk_timeout_seconds == 0 {
            return Err(FetchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(FetchError::Config("user_agent must not be empty".into()));
        }
        if self.request_delay_ms.0 > self.request_delay_ms.1 {
            return Err(FetchError::Config(
                "request_delay_ms min must be <= max".into(),
            ));
        }
        Ok(())
    }
}

/// Base URLs for every upstream, without trailing slashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// `www.sec.gov`: ticker map and filing archives.
    pub sec_www: String,
    /// `data.sec.gov`: submissions API.
    pub sec_data: String,
    /// DART Open API.
    pub dart_api: String,
    /// DART document viewer used in filing links.
    pub dart_view: String,
    /// Google APIs host for the YouTube Data API.
    pub youtube: String,
    pub openalex: String,
    pub newsapi: String,
    pub naver: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sec_www: "https://www.sec.gov".to_owned(),
            sec_data: "https://data.sec.gov".to_owned(),
            dart_api: "https://opendart.fss.or.kr".to_owned(),
            dart_view: "https://dart.fss.or.kr".to_owned(),
            youtube: "https://www.googleapis.com".to_owned(),
            openalex: "https://api.openalex.org".to_owned(),
            newsapi: "https://newsapi.org".to_owned(),
            naver: "https://openapi.naver.com".to_owned(),
        }
    }
}

impl Endpoints {
    /// Point every upstream at one base URL (for mock servers).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_owned();
        Self {
            sec_www: base.clone(),
            sec_data: base.clone(),
            dart_api: base.clone(),
            dart_view: base.clone(),
            youtube: base.clone(),
            openalex: base.clone(),
            newsapi: base.clone(),
            naver: base,
        }
    }
}

/// Upstream API credentials.
///
/// `Debug` is implemented by hand so keys never reach logs.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub dart: Option<String>,
    pub youtube: Option<String>,
    pub newsapi: Option<String>,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
}

impl ApiKeys {
    /// Read credentials from `DART_API_KEY`, `YOUTUBE_API_KEY`, `NEWS_API_KEY`,
    /// `NAVER_CLIENT_ID`, and `NAVER_CLIENT_SECRET`. Blank values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        Self {
            dart: get("DART_API_KEY"),
            youtube: get("YOUTUBE_API_KEY"),
            newsapi: get("NEWS_API_KEY"),
            naver_client_id: get("NAVER_CLIENT_ID"),
            naver_client_secret: get("NAVER_CLIENT_SECRET"),
        }
    }

    /// NAVER needs both the client id and the secret.
    pub fn naver(&self) -> Option<(&str, &str)> {
        match (&self.naver_client_id, &self.naver_client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// True if at least one news provider can be used.
    pub fn news_configured(&self) -> bool {
        self.newsapi.is_some() || self.naver().is_some()
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |k: &Option<String>| if k.is_some() { "set" } else { "unset" };
        f.debug_struct("ApiKeys")
            .field("dart", &mark(&self.dart))
            .field("youtube", &mark(&self.youtube))
            .field("newsapi", &mark(&self.newsapi))
            .field("naver_client_id", &mark(&self.naver_client_id))
            .field("naver_client_secret", &mark(&self.naver_client_secret))
            .finish()
    }
}
