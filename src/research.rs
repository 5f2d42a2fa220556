//! Research orchestration.
//!
//! One research run fans out to the filings collector (DART for Korean
//! stock codes, SEC otherwise), YouTube, OpenAlex, and news concurrently,
//! normalises every record into a [`SourceItem`], and screens papers and
//! filings into ranked institutional reports. Source failures never fail
//! the run: each becomes an [`ErrorItem`] in the response metadata.

use std::sync::Arc;
use std::time::Instant;

use ac_search::{
    Candidate, Clock, CollectRequest, Collectors, DEFAULT_MAX_AGE_DAYS, DartFiling, FetchError,
    NewsArticle, Paper, SecFiling, Source, SourceKind, TtlCache, Video, screen_at,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::schema::{
    ErrorItem, FilingSet, ReportEntry, ResearchMeta, ResearchResponse, ResearchResults,
    SourceItem, round_ms,
};
use crate::util::{is_korea_stock, slugify};

/// Filing collectors apply their own per-form caps.
const FILINGS_MAX_RESULTS: usize = usize::MAX;

/// Queries that contribute to a multi-query slug.
const MULTI_SLUG_QUERIES: usize = 3;

/// Per-source result limits for one research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub youtube: usize,
    pub papers: usize,
    pub news: usize,
    pub reports: usize,
}

impl Limits {
    /// The same limit for every source.
    pub fn uniform(max_results: usize) -> Self {
        Self {
            youtube: max_results,
            papers: max_results,
            news: max_results,
            reports: max_results,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            youtube: 30,
            papers: 30,
            news: 40,
            reports: 30,
        }
    }
}

/// Runs research queries and caches complete responses.
pub struct ResearchService {
    collectors: Collectors,
    responses: TtlCache<String, ResearchResponse>,
    clock: Arc<dyn Clock>,
    limits: Limits,
    multi_default: usize,
    multi_cap: usize,
}

impl ResearchService {
    /// Build the service and every collector from one config.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] if the collectors cannot be built.
    pub fn new(config: &ResearchConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let collectors = Collectors::new(&config.sources, clock.clone())
            .map_err(|e| ResearchError::Config(e.to_string()))?;
        Ok(Self {
            collectors,
            responses: TtlCache::with_capacity(
                config.cache.research_ttl_seconds,
                config.cache.max_entries,
                clock.clone(),
            ),
            clock,
            limits: config.limits.research_limits(),
            multi_default: config.limits.multi_max_results,
            multi_cap: config.limits.multi_max_results_cap,
        })
    }

    /// Research one query, serving a cached response when one is fresh.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::BadRequest`] if the query is blank.
    pub async fn research(&self, query: &str, daily_only: bool) -> Result<ResearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::BadRequest("query is required".into()));
        }

        let slug = slugify(query);
        let key = single_cache_key(&slug, daily_only);
        if let Some(cached) = self.responses.get(&key) {
            tracing::debug!(slug = %slug, "research cache hit");
            return Ok(cached);
        }

        let started = Instant::now();
        let (results, errors) = self.run_research(query, daily_only, &self.limits).await;
        let response = ResearchResponse {
            query: query.to_owned(),
            slug,
            results,
            meta: meta(started, errors),
        };
        tracing::info!(
            elapsed_ms = response.meta.elapsed_ms,
            errors = response.meta.errors.len(),
            "research completed"
        );
        self.responses.insert(key, response.clone());
        Ok(response)
    }

    /// Research several queries one after another and merge the results.
    ///
    /// Every item is tagged with the query it came from. Blank queries are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::BadRequest`] if no query is left or
    /// `max_results` is outside `1..=cap`.
    pub async fn research_multi(
        &self,
        queries: &[String],
        max_results: Option<usize>,
        daily_only: bool,
    ) -> Result<ResearchResponse> {
        let queries: Vec<&str> = queries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect();
        if queries.is_empty() {
            return Err(ResearchError::BadRequest("queries must not be empty".into()));
        }
        let max_results = max_results.unwrap_or(self.multi_default);
        if max_results == 0 || max_results > self.multi_cap {
            return Err(ResearchError::BadRequest(format!(
                "max_results must be between 1 and {}",
                self.multi_cap
            )));
        }

        let slug = slugify(
            &queries
                .iter()
                .take(MULTI_SLUG_QUERIES)
                .copied()
                .collect::<Vec<_>>()
                .join("_"),
        );
        let key = multi_cache_key(&slug, max_results, daily_only);
        if let Some(cached) = self.responses.get(&key) {
            tracing::debug!(slug = %slug, "multi research cache hit");
            return Ok(cached);
        }

        let started = Instant::now();
        let limits = Limits::uniform(max_results);
        let mut merged = ResearchResults::default();
        let mut errors = Vec::new();
        for query in &queries {
            let (mut results, query_errors) = self.run_research(query, daily_only, &limits).await;
            tag_query(&mut results, query);
            merge_into(&mut merged, results);
            errors.extend(query_errors);
        }

        let response = ResearchResponse {
            query: queries.join(" | "),
            slug,
            results: merged,
            meta: meta(started, errors),
        };
        tracing::info!(
            queries = queries.len(),
            elapsed_ms = response.meta.elapsed_ms,
            errors = response.meta.errors.len(),
            "multi research completed"
        );
        self.responses.insert(key, response.clone());
        Ok(response)
    }

    /// A cached single-query response for `slug`, if still fresh.
    pub fn cached(&self, slug: &str, daily_only: bool) -> Option<ResearchResponse> {
        self.responses.get(&single_cache_key(slug, daily_only))
    }

    /// Query every source for one query and screen reports.
    pub async fn run_research(
        &self,
        query: &str,
        daily_only: bool,
        limits: &Limits,
    ) -> (ResearchResults, Vec<ErrorItem>) {
        tracing::debug!(query = %query, daily_only, "research run");
        let request = |max: usize| CollectRequest::new(query, max).daily_only(daily_only);
        let youtube_request = request(limits.youtube);
        let papers_request = request(limits.papers);
        let news_request = request(limits.news);

        let (filings, youtube, papers, news) = tokio::join!(
            self.collect_filings(query, daily_only),
            self.collectors.youtube.collect(&youtube_request),
            self.collectors.papers.collect(&papers_request),
            self.collectors.news.collect(&news_request),
        );

        let mut errors = Vec::new();
        let mut results = ResearchResults::default();

        let (filings_kind, filings) = filings;
        if let Some(set) = settle(&mut errors, filings_kind, filings) {
            match filings_kind {
                SourceKind::Dart => results.dart = Some(set),
                _ => results.sec = Some(set),
            }
        }
        results.youtube = settle(&mut errors, SourceKind::YouTube, youtube)
            .unwrap_or_default()
            .iter()
            .map(video_item)
            .collect();
        results.papers = settle(&mut errors, SourceKind::Papers, papers)
            .unwrap_or_default()
            .iter()
            .map(paper_item)
            .collect();
        results.news = settle(&mut errors, SourceKind::News, news)
            .unwrap_or_default()
            .iter()
            .map(news_item)
            .collect();

        results.reports = self.screen_reports(query, &results, limits.reports);
        (results, errors)
    }

    async fn collect_filings(
        &self,
        query: &str,
        daily_only: bool,
    ) -> (SourceKind, std::result::Result<FilingSet, FetchError>) {
        if is_korea_stock(query) {
            let request = CollectRequest::new(query, FILINGS_MAX_RESULTS).daily_only(daily_only);
            let result = self.collectors.dart.collect(&request).await;
            (SourceKind::Dart, result.map(|rows| filing_set(&rows, dart_item)))
        } else {
            let request = CollectRequest::new(query.to_uppercase(), FILINGS_MAX_RESULTS)
                .daily_only(daily_only);
            let result = self.collectors.sec.collect(&request).await;
            (SourceKind::Sec, result.map(|rows| filing_set(&rows, sec_item)))
        }
    }

    /// Papers, SEC items, and DART items are the report candidates.
    fn screen_reports(
        &self,
        query: &str,
        results: &ResearchResults,
        max_items: usize,
    ) -> Vec<ReportEntry> {
        let filings = [&results.sec, &results.dart]
            .into_iter()
            .flatten()
            .flat_map(|set| set.items.iter());
        let candidates: Vec<Candidate> = results
            .papers
            .iter()
            .chain(filings)
            .map(|item| Candidate::from_value(serde_json::to_value(item).unwrap_or_default()))
            .collect();

        screen_at(
            query,
            &candidates,
            max_items,
            DEFAULT_MAX_AGE_DAYS,
            self.clock.now(),
        )
        .into_iter()
        .map(ReportEntry::from)
        .collect()
    }
}

impl std::fmt::Debug for ResearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchService")
            .field("limits", &self.limits)
            .field("cached_responses", &self.responses.len())
            .finish_non_exhaustive()
    }
}

/// Cache key for a single-query response. The export route uses it too.
pub fn single_cache_key(slug: &str, daily_only: bool) -> String {
    format!("research:{slug}:daily={}", u8::from(daily_only))
}

pub fn multi_cache_key(slug: &str, max_results: usize, daily_only: bool) -> String {
    format!(
        "research:multi:{slug}:max={max_results}:daily={}",
        u8::from(daily_only)
    )
}

fn meta(started: Instant, errors: Vec<ErrorItem>) -> ResearchMeta {
    ResearchMeta {
        elapsed_ms: round_ms(started.elapsed().as_secs_f64() * 1000.0),
        errors,
    }
}

/// Turn a collector result into its value, recording failures.
///
/// Missing credentials for optional sources are not failures.
fn settle<T>(
    errors: &mut Vec<ErrorItem>,
    source: SourceKind,
    result: std::result::Result<T, FetchError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(FetchError::NotConfigured(reason)) if source.is_optional() => {
            tracing::debug!(source = %source, reason = %reason, "source disabled");
            None
        }
        Err(err) => {
            tracing::warn!(source = %source, error = %err, "source failed");
            errors.push(ErrorItem {
                source,
                message: err.to_string(),
            });
            None
        }
    }
}

fn to_object<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn filing_set<T: Serialize>(rows: &[T], normalize: fn(&T) -> SourceItem) -> FilingSet {
    FilingSet {
        items: rows.iter().map(normalize).collect(),
        raw: rows.iter().map(to_object).collect(),
    }
}

fn sec_item(filing: &SecFiling) -> SourceItem {
    SourceItem::new(
        to_object(filing),
        format!(
            "{} {} {}",
            filing.ticker, filing.form, filing.published_date
        ),
        filing.url.as_str(),
        filing.published_date.as_str(),
        "",
    )
}

fn dart_item(filing: &DartFiling) -> SourceItem {
    SourceItem::new(
        to_object(filing),
        format!("{} {} {}", filing.company, filing.kind, filing.period),
        filing.url.as_str(),
        filing.filed_date.as_str(),
        filing.period.as_str(),
    )
}

fn video_item(video: &Video) -> SourceItem {
    SourceItem::new(
        to_object(video),
        video.title.as_str(),
        video.url.as_str(),
        video.published_at.as_str(),
        format!("{} min", video.duration_minutes.unwrap_or(0)),
    )
}

fn paper_item(paper: &Paper) -> SourceItem {
    let url = if paper.pdf_url.is_empty() {
        &paper.main_url
    } else {
        &paper.pdf_url
    };
    SourceItem::new(
        to_object(paper),
        paper.title.as_str(),
        url.as_str(),
        paper.year.map(|y| y.to_string()).unwrap_or_default(),
        format!("{} | {}", paper.authors, paper.venue),
    )
}

fn news_item(article: &NewsArticle) -> SourceItem {
    SourceItem::new(
        to_object(article),
        article.title.as_str(),
        article.url.as_str(),
        article.published_at.as_str(),
        article.source_name.as_str(),
    )
}

/// Tag every item and raw filing row with the query that produced it.
fn tag_query(results: &mut ResearchResults, query: &str) {
    let tag = |items: &mut Vec<SourceItem>| {
        for item in items {
            item.query = Some(query.to_owned());
        }
    };
    for set in [&mut results.dart, &mut results.sec].into_iter().flatten() {
        tag(&mut set.items);
        for row in &mut set.raw {
            row.insert("query".to_owned(), Value::String(query.to_owned()));
        }
    }
    tag(&mut results.youtube);
    tag(&mut results.papers);
    tag(&mut results.news);
    for entry in &mut results.reports {
        entry.query = Some(query.to_owned());
    }
}

/// Append one query's results. Filing sets stay `None` until they have items.
fn merge_into(merged: &mut ResearchResults, results: ResearchResults) {
    fn merge_set(into: &mut Option<FilingSet>, from: Option<FilingSet>) {
        let Some(from) = from.filter(|set| !set.is_empty()) else {
            return;
        };
        let set = into.get_or_insert_with(FilingSet::default);
        set.items.extend(from.items);
        set.raw.extend(from.raw);
    }

    merge_set(&mut merged.dart, results.dart);
    merge_set(&mut merged.sec, results.sec);
    merged.youtube.extend(results.youtube);
    merged.papers.extend(results.papers);
    merged.reports.extend(results.reports);
    merged.news.extend(results.news);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_search::{DartReportKind, NewsProvider, ReportItem};

    fn sec_filing() -> SecFiling {
        SecFiling {
            source_type: "SEC".into(),
            form: "10-K".into(),
            url: "https://www.sec.gov/Archives/edgar/data/320193/x/a.htm".into(),
            published_date: "2023-11-03".into(),
            ticker: "AAPL".into(),
        }
    }

    fn dart_filing() -> DartFiling {
        DartFiling {
            company: "삼성전자".into(),
            kind: DartReportKind::Quarterly,
            period: "2024.03".into(),
            filed_date: "2024-05-16".into(),
            url: "https://dart.fss.or.kr/dsaf001/main.do?rcpNo=1".into(),
        }
    }

    fn paper(pdf_url: &str) -> Paper {
        Paper {
            title: "Inflation dynamics".into(),
            authors: "A. Author, B. Author".into(),
            year: Some(2021),
            venue: "Journal of Money".into(),
            citation_count: 10,
            is_open_access: true,
            main_url: "https://openalex.org/W1".into(),
            pdf_url: pdf_url.into(),
        }
    }

    #[test]
    fn sec_items_are_normalised() {
        let item = sec_item(&sec_filing());
        assert_eq!(item.title, "AAPL 10-K 2023-11-03");
        assert_eq!(item.date, "2023-11-03");
        assert_eq!(item.snippet, "");
        assert_eq!(item.field("form"), "10-K");
        assert_eq!(item.field("published_date"), "2023-11-03");
    }

    #[test]
    fn dart_items_are_normalised() {
        let item = dart_item(&dart_filing());
        assert_eq!(item.title, "삼성전자 분기 2024.03");
        assert_eq!(item.date, "2024-05-16");
        assert_eq!(item.snippet, "2024.03");
        assert_eq!(item.field("회사명"), "삼성전자");
    }

    #[test]
    fn video_snippet_defaults_to_zero_minutes() {
        let item = video_item(&Video {
            title: "Rates".into(),
            url: "https://www.youtube.com/watch?v=v1".into(),
            duration_minutes: None,
            published_at: "2024-05-30T00:00:00Z".into(),
        });
        assert_eq!(item.snippet, "0 min");
        assert_eq!(item.date, "2024-05-30T00:00:00Z");
    }

    #[test]
    fn paper_url_prefers_pdf() {
        let item = paper_item(&paper("https://arxiv.org/pdf/1.pdf"));
        assert_eq!(item.url, "https://arxiv.org/pdf/1.pdf");
        assert_eq!(item.date, "2021");
        assert_eq!(item.snippet, "A. Author, B. Author | Journal of Money");
        assert_eq!(item.field("main_url"), "https://openalex.org/W1");

        let item = paper_item(&paper(""));
        assert_eq!(item.url, "https://openalex.org/W1");
    }

    #[test]
    fn news_snippet_is_source_name() {
        let item = news_item(&NewsArticle {
            title: "Chips".into(),
            url: "https://www.ft.com/1".into(),
            published_at: "2024-05-31T10:00:00Z".into(),
            source_name: "FT".into(),
            provider: NewsProvider::NewsApi,
        });
        assert_eq!(item.snippet, "FT");
        assert_eq!(item.field("provider"), "newsapi");
    }

    #[test]
    fn settle_skips_unconfigured_optional_sources() {
        let mut errors = Vec::new();
        let out: Option<Vec<Video>> = settle(
            &mut errors,
            SourceKind::YouTube,
            Err(FetchError::NotConfigured("YOUTUBE_API_KEY is not set".into())),
        );
        assert!(out.is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn settle_records_failures() {
        let mut errors = Vec::new();
        let out: Option<FilingSet> = settle(
            &mut errors,
            SourceKind::Dart,
            Err(FetchError::NotConfigured("DART_API_KEY is not set".into())),
        );
        assert!(out.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].source, SourceKind::Dart);
        assert!(errors[0].message.contains("DART_API_KEY"));
    }

    #[test]
    fn cache_keys() {
        assert_eq!(single_cache_key("aapl", false), "research:aapl:daily=0");
        assert_eq!(single_cache_key("aapl", true), "research:aapl:daily=1");
        assert_eq!(
            multi_cache_key("aapl_msft", 10, false),
            "research:multi:aapl_msft:max=10:daily=0"
        );
    }

    #[test]
    fn uniform_limits() {
        assert_eq!(
            Limits::uniform(7),
            Limits {
                youtube: 7,
                papers: 7,
                news: 7,
                reports: 7
            }
        );
    }

    fn results_with_filings() -> ResearchResults {
        ResearchResults {
            sec: Some(filing_set(&[sec_filing()], sec_item)),
            papers: vec![paper_item(&paper("https://arxiv.org/pdf/1.pdf"))],
            reports: vec![ReportEntry::from(ReportItem {
                source: "arxiv.org".into(),
                title: "Inflation dynamics".into(),
                url: "https://arxiv.org/pdf/1.pdf".into(),
                published_date: "2021".into(),
                snippet: String::new(),
                score: 70,
            })],
            ..Default::default()
        }
    }

    #[test]
    fn tagging_reaches_items_and_raw_rows() {
        let mut results = results_with_filings();
        tag_query(&mut results, "AAPL");

        let sec = results.sec.as_ref().expect("sec set");
        assert_eq!(sec.items[0].query.as_deref(), Some("AAPL"));
        assert_eq!(sec.raw[0]["query"], "AAPL");
        assert_eq!(results.papers[0].query.as_deref(), Some("AAPL"));
        assert_eq!(results.reports[0].query.as_deref(), Some("AAPL"));
    }

    #[test]
    fn merging_concatenates_and_skips_empty_filings() {
        let mut merged = ResearchResults::default();
        merge_into(&mut merged, results_with_filings());
        merge_into(
            &mut merged,
            ResearchResults {
                dart: Some(FilingSet::default()),
                ..results_with_filings()
            },
        );

        assert!(merged.dart.is_none());
        let sec = merged.sec.as_ref().expect("sec set");
        assert_eq!(sec.items.len(), 2);
        assert_eq!(sec.raw.len(), 2);
        assert_eq!(merged.papers.len(), 2);
        assert_eq!(merged.reports.len(), 2);
    }

    #[test]
    fn filing_raw_rows_keep_field_order() {
        let set = filing_set(&[dart_filing()], dart_item);
        let keys: Vec<&str> = set.raw[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["회사명", "보고서 종류", "기준연도/분기", "제출일", "url"]);
    }
}
