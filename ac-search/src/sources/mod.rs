//! Upstream collector implementations.
//!
//! Each module provides a struct implementing [`crate::source::Source`]
//! against one upstream API. Collectors share a single
//! [`reqwest::Client`] and take base URLs from
//! [`SourceConfig::endpoints`](crate::config::SourceConfig::endpoints).

pub mod dart;
pub mod news;
pub mod openalex;
pub mod sec;
pub mod youtube;

pub use dart::DartSource;
pub use news::NewsSource;
pub use openalex::OpenAlexSource;
pub use sec::SecSource;
pub use youtube::YouTubeSource;

use std::sync::Arc;

use crate::cache::Clock;
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;

/// Every collector, built from one config and sharing one HTTP client.
pub struct Collectors {
    pub sec: SecSource,
    pub dart: DartSource,
    pub youtube: YouTubeSource,
    pub papers: OpenAlexSource,
    pub news: NewsSource,
}

impl Collectors {
    /// Build all collectors.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if the config is invalid, or
    /// [`FetchError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &SourceConfig, clock: Arc<dyn Clock>) -> Result<Self, FetchError> {
        config.validate()?;
        let client = http::build_client(config)?;
        Ok(Self {
            sec: SecSource::new(client.clone(), config, clock.clone()),
            dart: DartSource::new(client.clone(), config, clock.clone()),
            youtube: YouTubeSource::new(client.clone(), config, clock.clone()),
            papers: OpenAlexSource::new(client.clone(), config),
            news: NewsSource::new(client, config, clock),
        })
    }
}

impl std::fmt::Debug for Collectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collectors").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;

    #[test]
    fn collectors_build_from_default_config() {
        let collectors = Collectors::new(&SourceConfig::default(), Arc::new(SystemClock));
        assert!(collectors.is_ok());
    }

    #[test]
    fn collectors_reject_invalid_config() {
        let config = SourceConfig {
            user_agent: String::new(),
            ..Default::default()
        };
        assert!(Collectors::new(&config, Arc::new(SystemClock)).is_err());
    }
}
