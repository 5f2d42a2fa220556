//! Core types: source identification, screener input/output, and the
//! records each upstream collector produces.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Upstream sources that feed a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// SEC EDGAR filings (US tickers).
    Sec,
    /// DART Open API filings (Korean stock codes).
    Dart,
    /// YouTube Data API video search.
    #[serde(rename = "youtube")]
    YouTube,
    /// OpenAlex academic papers.
    Papers,
    /// NewsAPI / NAVER news search.
    News,
    /// Screened institutional reports.
    Reports,
}

impl SourceKind {
    /// Returns the short, stable identifier used in responses and error items.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sec => "sec",
            Self::Dart => "dart",
            Self::YouTube => "youtube",
            Self::Papers => "papers",
            Self::News => "news",
            Self::Reports => "reports",
        }
    }

    /// Whether a missing API credential should be treated as "source disabled"
    /// rather than as an error worth reporting.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::YouTube | Self::News)
    }

    /// Returns all source variants.
    pub fn all() -> &'static [SourceKind] {
        &[
            Self::Sec,
            Self::Dart,
            Self::YouTube,
            Self::Papers,
            Self::News,
            Self::Reports,
        ]
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loosely-typed record offered to the report screener.
///
/// Upstream sources disagree on field names, so every field is optional and
/// deserialisation never fails on an object: strings are kept, numbers are
/// rendered as text, and anything else (null, `false`, empty strings, arrays,
/// objects) reads as absent. Unknown fields land in [`Candidate::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub main_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(
        rename = "abstract",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Source-specific fields the screener does not read.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Candidate {
    /// Build a candidate from any JSON value. Non-objects yield an empty candidate.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Candidate with only a URL set.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the snippet.
    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Set the `published_date` field.
    pub fn published(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }

    /// First non-empty of `url`, `main_url`, `link`, `pdf_url`.
    pub fn primary_url(&self) -> &str {
        first_non_empty(&[&self.url, &self.main_url, &self.link, &self.pdf_url])
    }

    /// Title, or empty.
    pub fn title_text(&self) -> &str {
        first_non_empty(&[&self.title])
    }

    /// First non-empty of `snippet`, `abstract`.
    pub fn snippet_text(&self) -> &str {
        first_non_empty(&[&self.snippet, &self.abstract_text])
    }

    /// First non-empty of `published_date`, `published_at`, `date`.
    pub fn date_text(&self) -> &str {
        first_non_empty(&[&self.published_date, &self.published_at, &self.date])
    }
}

fn first_non_empty<'a>(fields: &[&'a Option<String>]) -> &'a str {
    fields
        .iter()
        .filter_map(|f| f.as_deref())
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_text))
}

/// Render a scalar JSON value as text; falsy and structured values read as absent.
pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => {
            let zero = n.as_f64().is_some_and(|f| f == 0.0);
            (!zero).then(|| n.to_string())
        }
        Value::Bool(true) => Some("true".to_owned()),
        _ => None,
    }
}

/// A screened, scored institutional report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    /// The matched allowlist domain (not the full host).
    pub source: String,
    pub title: String,
    pub url: String,
    /// The candidate's original date string, unparsed.
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub score: i64,
}

/// A filing document link from SEC EDGAR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecFiling {
    /// Always `"SEC"`.
    pub source_type: String,
    /// Form type: `10-K`, `10-Q`, or `8-K`.
    pub form: String,
    pub url: String,
    /// Filing date as `YYYY-MM-DD`.
    pub published_date: String,
    /// Upper-cased ticker the filing was collected for.
    pub ticker: String,
}

/// Report category assigned from a DART report name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DartReportKind {
    /// 사업보고서.
    #[serde(rename = "연간")]
    Annual,
    /// 반기/분기 보고서.
    #[serde(rename = "분기")]
    Quarterly,
    /// 주요사항보고서 from the last year.
    #[serde(rename = "주요사항(1y)")]
    MajorEvent,
}

impl DartReportKind {
    /// Label used on the wire and in spreadsheet rows.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Annual => "연간",
            Self::Quarterly => "분기",
            Self::MajorEvent => "주요사항(1y)",
        }
    }
}

impl fmt::Display for DartReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A filing from the DART Open API, keyed with DART's Korean column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DartFiling {
    #[serde(rename = "회사명")]
    pub company: String,
    #[serde(rename = "보고서 종류")]
    pub kind: DartReportKind,
    /// Base year or quarter extracted from the report name.
    #[serde(rename = "기준연도/분기")]
    pub period: String,
    /// Receipt date as `YYYY-MM-DD`.
    #[serde(rename = "제출일")]
    pub filed_date: String,
    pub url: String,
}

/// A long-form YouTube video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub url: String,
    /// `search.list` does not return durations; kept for the export layout.
    pub duration_minutes: Option<u32>,
    pub published_at: String,
}

/// An open-access paper with a PDF link, from OpenAlex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: String,
    pub year: Option<i32>,
    pub venue: String,
    pub citation_count: u64,
    pub is_open_access: bool,
    pub main_url: String,
    pub pdf_url: String,
}

/// News search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsProvider {
    /// NewsAPI.org, used first for non-Korean queries.
    NewsApi,
    /// NAVER news search, used first for Korean queries.
    Naver,
}

impl NewsProvider {
    /// Stable identifier, also used in cache keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewsApi => "newsapi",
            Self::Naver => "naver",
        }
    }
}

impl fmt::Display for NewsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A news article, deduplicated by canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    /// The article URL as returned upstream (not canonicalised).
    pub url: String,
    /// ISO-8601 timestamp, or the raw upstream value when it could not be parsed.
    pub published_at: String,
    pub source_name: String,
    pub provider: NewsProvider,
}
