//! # ac-search
//!
//! Source collectors and the report screener behind AC-research.
//!
//! This crate pulls filings, videos, papers, and news for a query from
//! public upstream APIs and ranks institutional reports. It is a library:
//! the HTTP service lives in the `ac-research` package.
//!
//! ## Design
//!
//! - One collector per upstream (SEC EDGAR, DART, YouTube, OpenAlex,
//!   NewsAPI/NAVER), each implementing [`Source`]
//! - Collectors return every failure as a [`FetchError`]; callers decide
//!   whether to degrade to an empty result
//! - Per-collector [`TtlCache`]s driven by an injectable [`Clock`]
//! - [`screen`] filters candidates by an institutional domain allowlist,
//!   deduplicates, and ranks them by authority, recency, and keyword hits
//!
//! ## Security
//!
//! - API keys are read from the environment and never serialised or logged
//! - Queries are logged only at trace/debug level
//! - Upstream error bodies are truncated and stripped of request URLs

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod screener;
pub mod source;
pub mod sources;
pub mod types;
pub mod url_normalize;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use config::{ApiKeys, Endpoints, SourceConfig};
pub use error::{FetchError, Result};
pub use screener::{screen, screen_at, DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_ITEMS};
pub use source::{CollectRequest, Source};
pub use sources::Collectors;
pub use types::{
    Candidate, DartFiling, DartReportKind, NewsArticle, NewsProvider, Paper, ReportItem,
    SecFiling, SourceKind, Video,
};

/// Screen candidates with the default cap (30) and age cutoff (five years).
///
/// # Examples
///
/// ```
/// use ac_search::{screen_default, Candidate};
///
/// let candidates = vec![
///     Candidate::with_url("https://www.bis.org/publ/arpdf/ar2024e.pdf")
///         .title("Annual Economic Report 2024"),
///     Candidate::with_url("https://example.com/blog").title("Not an institution"),
/// ];
/// let reports = screen_default("annual economic report", &candidates);
/// assert_eq!(reports.len(), 1);
/// assert_eq!(reports[0].source, "bis.org");
/// ```
pub fn screen_default(query: &str, candidates: &[Candidate]) -> Vec<ReportItem> {
    screen(query, candidates, DEFAULT_MAX_ITEMS, DEFAULT_MAX_AGE_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_default_uses_defaults() {
        let candidates: Vec<Candidate> = (0..40)
            .map(|i| Candidate::with_url(format!("https://www.imf.org/p/{i}")))
            .collect();
        assert_eq!(screen_default("", &candidates).len(), DEFAULT_MAX_ITEMS);
    }

    #[test]
    fn screen_default_empty_input() {
        assert!(screen_default("anything", &[]).is_empty());
    }
}
