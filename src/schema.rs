//! Request and response bodies for the research API.

use ac_search::{ReportItem, SourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys owned by [`SourceItem`] itself; raw fields with these names are dropped.
const ITEM_KEYS: &[&str] = &["title", "url", "date", "snippet", "query"];

/// A source record normalised for display.
///
/// `title`, `url`, `date`, and `snippet` are uniform across sources. Every
/// other field of the raw record is kept alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    /// The query this item was found for (multi-query research only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(flatten)]
    pub raw: Map<String, Value>,
}

impl SourceItem {
    /// Build an item from a raw record and its display fields.
    pub fn new(
        mut raw: Map<String, Value>,
        title: impl Into<String>,
        url: impl Into<String>,
        date: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        for key in ITEM_KEYS {
            raw.remove(*key);
        }
        Self {
            title: title.into(),
            url: url.into(),
            date: date.into(),
            snippet: snippet.into(),
            query: None,
            raw,
        }
    }

    /// A raw field, or `Null` if absent.
    pub fn field(&self, key: &str) -> &Value {
        self.raw.get(key).unwrap_or(&Value::Null)
    }
}

/// Filings from SEC or DART: normalised items plus the raw rows for export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingSet {
    pub items: Vec<SourceItem>,
    pub raw: Vec<Map<String, Value>>,
}

impl FilingSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A screened report as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub item: ReportItem,
    /// Copy of `published_date`.
    pub date: String,
    /// Copy of `source`.
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl From<ReportItem> for ReportEntry {
    fn from(item: ReportItem) -> Self {
        Self {
            date: item.published_date.clone(),
            source_type: item.source.clone(),
            query: None,
            item,
        }
    }
}

/// Results for every source. Filing sets are `null` when the source was not
/// queried or found nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchResults {
    #[serde(default)]
    pub dart: Option<FilingSet>,
    #[serde(default)]
    pub sec: Option<FilingSet>,
    #[serde(default)]
    pub youtube: Vec<SourceItem>,
    #[serde(default)]
    pub papers: Vec<SourceItem>,
    #[serde(default)]
    pub reports: Vec<ReportEntry>,
    #[serde(default)]
    pub news: Vec<SourceItem>,
}

/// One source that failed during a research run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub source: SourceKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchMeta {
    /// Wall time of the run in milliseconds, rounded to two decimals.
    pub elapsed_ms: f64,
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub query: String,
    pub slug: String,
    pub results: ResearchResults,
    pub meta: ResearchMeta,
}

/// Body of `POST /api/research`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub query: String,
}

/// Body of `POST /api/research/multi`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiResearchRequest {
    #[serde(default)]
    pub queries: Vec<String>,
    /// Per-query limit for videos, papers, news, and reports.
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Query string shared by every research route.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ResearchParams {
    #[serde(default)]
    pub daily_only: bool,
}

/// Round to two decimals.
pub(crate) fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
