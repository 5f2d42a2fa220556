//! SEC EDGAR: annual, quarterly, and current-report filing links for a ticker.
//!
//! Resolves the ticker through `company_tickers.json`, then reads the
//! company's recent filings from the submissions API in a single request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::cache::{Clock, TtlCache};
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;
use crate::source::{CollectRequest, Source};
use crate::types::{SecFiling, SourceKind};

/// 10-K filings older than this are dropped.
const ANNUAL_WINDOW_DAYS: i64 = 5 * 365;
/// 8-K filings older than this are dropped.
const CURRENT_REPORT_WINDOW_DAYS: i64 = 365;
const MAX_QUARTERLY: usize = 4;
const MAX_CURRENT_REPORTS: usize = 30;

const TICKER_MAP_KEY: &str = "company_tickers";

/// One row of `company_tickers.json`.
#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
}

#[derive(Debug, Default, Deserialize)]
struct Submissions {
    #[serde(default)]
    filings: SubmissionFilings,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionFilings {
    #[serde(default)]
    recent: RecentFilings,
}

/// Column-oriented recent filings as returned by the submissions API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    #[serde(default)]
    accession_number: Vec<String>,
    #[serde(default)]
    filing_date: Vec<String>,
    #[serde(default)]
    form: Vec<String>,
    #[serde(default)]
    primary_document: Vec<String>,
}

/// SEC EDGAR collector.
pub struct SecSource {
    client: reqwest::Client,
    www_base: String,
    data_base: String,
    clock: Arc<dyn Clock>,
    tickers: TtlCache<&'static str, Arc<HashMap<String, u64>>>,
}

impl SecSource {
    pub fn new(client: reqwest::Client, config: &SourceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            www_base: config.endpoints.sec_www.clone(),
            data_base: config.endpoints.sec_data.clone(),
            tickers: TtlCache::with_capacity(config.lookup_cache_ttl_seconds, 1, clock.clone()),
            clock,
        }
    }

    /// Resolve a ticker (case-insensitive) to its CIK.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] for unknown tickers, or any error from
    /// fetching the ticker map.
    pub async fn cik_for_ticker(&self, ticker: &str) -> Result<u64, FetchError> {
        let map = match self.tickers.get(&TICKER_MAP_KEY) {
            Some(map) => map,
            None => {
                let url = format!("{}/files/company_tickers.json", self.www_base);
                let raw: HashMap<String, TickerEntry> =
                    http::get_json(self.client.get(url), "SEC ticker map").await?;
                let map = Arc::new(ticker_map(raw));
                tracing::debug!(count = map.len(), "SEC ticker map loaded");
                self.tickers.insert(TICKER_MAP_KEY, map.clone());
                map
            }
        };

        map.get(&ticker.to_uppercase())
            .copied()
            .ok_or_else(|| FetchError::NotFound(format!("CIK not found for ticker {ticker}")))
    }
}

impl Source for SecSource {
    type Item = SecFiling;

    fn kind(&self) -> SourceKind {
        SourceKind::Sec
    }

    async fn collect(&self, request: &CollectRequest) -> Result<Vec<SecFiling>, FetchError> {
        let ticker = request.query.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(FetchError::InvalidQuery("ticker is required".into()));
        }
        tracing::trace!(ticker = %ticker, "SEC collect");

        let cik = self.cik_for_ticker(&ticker).await?;
        let url = format!("{}/submissions/CIK{cik:010}.json", self.data_base);
        let submissions: Submissions =
            http::get_json(self.client.get(url), "SEC submissions").await?;

        let today = self.clock.now().date_naive();
        let filings = select_filings(
            &submissions.filings.recent,
            &FilingContext {
                cik,
                ticker: &ticker,
                www_base: &self.www_base,
                today,
                daily_only: request.daily_only,
            },
        );
        tracing::debug!(count = filings.len(), "SEC filings collected");
        Ok(filings)
    }
}

fn ticker_map(raw: HashMap<String, TickerEntry>) -> HashMap<String, u64> {
    raw.into_values()
        .map(|entry| (entry.ticker.to_uppercase(), entry.cik_str))
        .collect()
}

struct FilingContext<'a> {
    cik: u64,
    ticker: &'a str,
    www_base: &'a str,
    today: NaiveDate,
    daily_only: bool,
}

/// Pick 10-K (5 years), the latest four 10-Q, and 8-K (1 year, at most 30)
/// from the recent-filings columns, newest first.
fn select_filings(recent: &RecentFilings, ctx: &FilingContext<'_>) -> Vec<SecFiling> {
    let annual_cutoff = ctx.today - Duration::days(ANNUAL_WINDOW_DAYS);
    let current_cutoff = ctx.today - Duration::days(CURRENT_REPORT_WINDOW_DAYS);
    let daily_cutoff = ctx.today - Duration::days(1);

    let mut annual = Vec::new();
    let mut quarterly = Vec::new();
    let mut current = Vec::new();

    let rows = recent
        .form
        .iter()
        .zip(&recent.filing_date)
        .zip(&recent.accession_number)
        .zip(&recent.primary_document);

    for (((form, date), accession), document) in rows {
        let Ok(filed) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") else {
            continue;
        };
        if ctx.daily_only && filed < daily_cutoff {
            continue;
        }
        let bucket = match form.as_str() {
            "10-K" if filed >= annual_cutoff => &mut annual,
            "10-Q" => &mut quarterly,
            "8-K" if filed >= current_cutoff => &mut current,
            _ => continue,
        };
        bucket.push(SecFiling {
            source_type: "SEC".to_owned(),
            form: form.clone(),
            url: document_url(ctx.www_base, ctx.cik, accession, document),
            published_date: filed.format("%Y-%m-%d").to_string(),
            ticker: ctx.ticker.to_owned(),
        });
    }

    for bucket in [&mut annual, &mut quarterly, &mut current] {
        bucket.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    }
    quarterly.truncate(MAX_QUARTERLY);
    current.truncate(MAX_CURRENT_REPORTS);

    let mut filings: Vec<SecFiling> = annual.into_iter().chain(quarterly).chain(current).collect();
    filings.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    filings
}

fn document_url(www_base: &str, cik: u64, accession: &str, document: &str) -> String {
    format!(
        "{www_base}/Archives/edgar/data/{cik}/{}/{document}",
        accession.replace('-', "")
    )
}
