//! Configuration types for the research service.
//!
//! [`ResearchConfig`] is read from TOML (every section optional), then
//! overridden from the environment. API keys only ever come from the
//! environment.

use std::path::{Path, PathBuf};

use ac_search::{ApiKeys, SourceConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};
use crate::research::Limits;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "AC_RESEARCH_CONFIG";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// HTTP listener and CORS.
    pub server: ServerConfig,
    /// Response cache.
    pub cache: CacheConfig,
    /// Per-source result limits.
    pub limits: LimitsConfig,
    /// Upstream collectors.
    pub sources: SourceConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks a free port.
    pub port: u16,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Production mode hides internal error detail from responses.
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 10000,
            allowed_origins: Vec::new(),
            production: false,
        }
    }
}

/// Research response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a research response stays cached (and exportable), in seconds.
    pub research_ttl_seconds: u64,
    /// Maximum cached responses.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            research_ttl_seconds: 600,
            max_entries: 256,
        }
    }
}

/// Result limits for single-query and multi-query research.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub youtube: usize,
    pub papers: usize,
    pub news: usize,
    pub reports: usize,
    /// Per-query limit for multi-query research when the request sets none.
    pub multi_max_results: usize,
    /// Largest per-query limit a multi-query request may ask for.
    pub multi_max_results_cap: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            youtube: 30,
            papers: 30,
            news: 40,
            reports: 30,
            multi_max_results: 10,
            multi_max_results_cap: 100,
        }
    }
}

impl LimitsConfig {
    /// Limits for a single-query run.
    pub fn research_limits(&self) -> Limits {
        Limits {
            youtube: self.youtube,
            papers: self.papers,
            news: self.news,
            reports: self.reports,
        }
    }
}

impl ResearchConfig {
    /// Load from `$AC_RESEARCH_CONFIG` or the default path if the file exists,
    /// then apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, an override is
    /// malformed, or the result fails validation.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_config_path);

        let mut config = if path.exists() {
            tracing::debug!(path = %path.display(), "loading config file");
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ResearchError::Config(e.to_string()))
    }

    /// Returns the default config file path: `<config dir>/ac-research/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("ac-research"))
            .unwrap_or_else(|| PathBuf::from("/tmp/ac-research"))
            .join("config.toml")
    }

    /// Apply overrides from `PORT`, `HOST`, `ALLOWED_ORIGINS`, `ENV`, and the
    /// API key variables read by [`ApiKeys::from_lookup`].
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] if `PORT` is not a valid port.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ResearchError::Config(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(env) = get("ENV") {
            self.server.production = env.eq_ignore_ascii_case("production");
        }
        self.sources.keys = ApiKeys::from_lookup(&lookup);
        Ok(())
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - every result limit is greater than 0
    /// - `multi_max_results` does not exceed `multi_max_results_cap`
    /// - `research_ttl_seconds` and `max_entries` are greater than 0
    /// - the collector config is valid
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        let named = [
            ("youtube", limits.youtube),
            ("papers", limits.papers),
            ("news", limits.news),
            ("reports", limits.reports),
            ("multi_max_results", limits.multi_max_results),
        ];
        if let Some((name, _)) = named.iter().find(|(_, v)| *v == 0) {
            return Err(ResearchError::Config(format!(
                "limits.{name} must be greater than 0"
            )));
        }
        if limits.multi_max_results > limits.multi_max_results_cap {
            return Err(ResearchError::Config(
                "limits.multi_max_results must be <= limits.multi_max_results_cap".into(),
            ));
        }
        if self.cache.research_ttl_seconds == 0 || self.cache.max_entries == 0 {
            return Err(ResearchError::Config(
                "cache.research_ttl_seconds and cache.max_entries must be greater than 0".into(),
            ));
        }
        self.sources
            .validate()
            .map_err(|e| ResearchError::Config(e.to_string()))
    }
}
