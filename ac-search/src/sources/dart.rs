//! DART Open API: Korean annual, quarterly, and major-event filings.
//!
//! The stock code is mapped to DART's corp code through the `corpCode.xml`
//! archive (a zip of one large XML file, cached), then the filing list is
//! paged over a five-year window and classified by report name.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, OnceLock};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::cache::{Clock, TtlCache};
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::http;
use crate::source::{CollectRequest, Source};
use crate::types::{DartFiling, DartReportKind, SourceKind};

const PAGE_COUNT: usize = 100;
/// Guard against an upstream that never returns a short page.
const MAX_PAGES: usize = 50;
const LIST_WINDOW_DAYS: i64 = 5 * 365;
const MAJOR_EVENT_WINDOW_DAYS: i64 = 365;
const MAX_ANNUAL: usize = 5;
const MAX_QUARTERLY: usize = 4;
const MAX_MAJOR_EVENTS: usize = 30;

const STATUS_OK: &str = "000";
const STATUS_NO_DATA: &str = "013";

const CORP_CODES_KEY: &str = "corp_codes";

const ANNUAL_KEYWORDS: &[&str] = &["사업보고서"];
const QUARTERLY_KEYWORDS: &[&str] = &["반기보고서", "1분기보고서", "3분기보고서", "분기보고서"];
const MAJOR_EVENT_KEYWORDS: &[&str] = &["주요사항보고서"];

/// A listed company from the corp-code archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpInfo {
    pub corp_code: String,
    pub corp_name: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    list: Vec<ListItem>,
}

/// One row of `list.json`.
#[derive(Debug, Clone, Default, Deserialize)]
struct ListItem {
    #[serde(default)]
    report_nm: String,
    #[serde(default)]
    rcept_no: String,
    #[serde(default)]
    rcept_dt: String,
}

/// DART collector. Requires `DART_API_KEY`.
pub struct DartSource {
    client: reqwest::Client,
    api_base: String,
    view_base: String,
    api_key: Option<String>,
    bulk_timeout: StdDuration,
    clock: Arc<dyn Clock>,
    corp_codes: TtlCache<&'static str, Arc<HashMap<String, CorpInfo>>>,
}

impl DartSource {
    pub fn new(client: reqwest::Client, config: &SourceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            api_base: config.endpoints.dart_api.clone(),
            view_base: config.endpoints.dart_view.clone(),
            api_key: config.keys.dart.clone(),
            bulk_timeout: StdDuration::from_secs(config.bulk_timeout_seconds),
            corp_codes: TtlCache::with_capacity(config.lookup_cache_ttl_seconds, 1, clock.clone()),
            clock,
        }
    }

    fn api_key(&self) -> Result<&str, FetchError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| FetchError::NotConfigured("DART_API_KEY is not set".into()))
    }

    /// Look up the corp code and name for a six-digit stock code.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] if no listed company has the code.
    pub async fn corp_for_stock_code(&self, stock_code: &str) -> Result<CorpInfo, FetchError> {
        let key = self.api_key()?;
        let codes = match self.corp_codes.get(&CORP_CODES_KEY) {
            Some(codes) => codes,
            None => {
                let url = format!("{}/api/corpCode.xml", self.api_base);
                let request = self
                    .client
                    .get(url)
                    .query(&[("crtfc_key", key)])
                    .timeout(self.bulk_timeout);
                let archive = http::get_bytes(request, "DART corp codes").await?;
                let xml = extract_xml(&archive)?;
                let codes = Arc::new(parse_corp_codes(&xml)?);
                tracing::debug!(count = codes.len(), "DART corp codes loaded");
                self.corp_codes.insert(CORP_CODES_KEY, codes.clone());
                codes
            }
        };

        codes.get(stock_code).cloned().ok_or_else(|| {
            FetchError::NotFound(format!("no listed company for stock code {stock_code}"))
        })
    }

    async fn fetch_list(
        &self,
        corp_code: &str,
        begin: &str,
        end: &str,
    ) -> Result<Vec<ListItem>, FetchError> {
        let key = self.api_key()?;
        let url = format!("{}/api/list.json", self.api_base);
        let page_count = PAGE_COUNT.to_string();
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let page_no = page.to_string();
            let request = self.client.get(&url).query(&[
                ("crtfc_key", key),
                ("corp_code", corp_code),
                ("bgn_de", begin),
                ("end_de", end),
                ("page_no", page_no.as_str()),
                ("page_count", page_count.as_str()),
            ]);
            let response: ListResponse = http::get_json(request, "DART list").await?;

            match response.status.as_str() {
                STATUS_OK => {}
                STATUS_NO_DATA => break,
                _ => {
                    return Err(FetchError::Api(format!(
                        "DART status {}: {}",
                        response.status, response.message
                    )))
                }
            }

            let count = response.list.len();
            items.extend(response.list);
            if count < PAGE_COUNT {
                break;
            }
        }
        Ok(items)
    }
}

impl Source for DartSource {
    type Item = DartFiling;

    fn kind(&self) -> SourceKind {
        SourceKind::Dart
    }

    async fn collect(&self, request: &CollectRequest) -> Result<Vec<DartFiling>, FetchError> {
        self.api_key()?;
        let stock_code = normalize_stock_code(&request.query)?;
        let corp = self.corp_for_stock_code(&stock_code).await?;
        tracing::trace!(stock_code = %stock_code, corp_code = %corp.corp_code, "DART collect");

        let now = self.clock.now();
        let window = if request.daily_only {
            Duration::days(1)
        } else {
            Duration::days(LIST_WINDOW_DAYS)
        };
        let begin = (now - window).format("%Y%m%d").to_string();
        let end = now.format("%Y%m%d").to_string();

        let items = self.fetch_list(&corp.corp_code, &begin, &end).await?;
        let filings = select_filings(&items, &corp.corp_name, &self.view_base, now);
        tracing::debug!(raw = items.len(), count = filings.len(), "DART filings collected");
        Ok(filings)
    }
}

/// Keep the digits of a query; at least six are required, padded to six.
///
/// # Errors
///
/// Returns [`FetchError::InvalidQuery`] for fewer than six digits.
pub fn normalize_stock_code(query: &str) -> Result<String, FetchError> {
    let digits: String = query.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 6 {
        return Err(FetchError::InvalidQuery(format!(
            "stock code needs at least 6 digits: {query}"
        )));
    }
    Ok(format!("{digits:0>6}"))
}

/// Pull the XML document out of the corp-code archive.
fn extract_xml(archive: &[u8]) -> Result<String, FetchError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| FetchError::Parse(format!("DART corp-code archive: {e}")))?;
    if zip.len() == 0 {
        return Err(FetchError::Parse("DART corp-code archive is empty".into()));
    }

    let mut index = 0;
    for i in 0..zip.len() {
        let entry = zip
            .by_index(i)
            .map_err(|e| FetchError::Parse(format!("DART corp-code archive entry: {e}")))?;
        if entry.name().to_ascii_lowercase().ends_with(".xml") {
            index = i;
            break;
        }
    }

    let mut file = zip
        .by_index(index)
        .map_err(|e| FetchError::Parse(format!("DART corp-code archive entry: {e}")))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| FetchError::Parse(format!("DART corp-code XML is not UTF-8: {e}")))?;
    Ok(xml)
}

/// Map stock codes to corp info. Unlisted companies (blank stock code) are skipped.
fn parse_corp_codes(xml: &str) -> Result<HashMap<String, CorpInfo>, FetchError> {
    let document = Html::parse_document(xml);
    let selector = |s: &str| {
        Selector::parse(s).map_err(|e| FetchError::Parse(format!("invalid selector {s}: {e:?}")))
    };
    let list_sel = selector("list")?;
    let code_sel = selector("corp_code")?;
    let name_sel = selector("corp_name")?;
    let stock_sel = selector("stock_code")?;

    let text = |el: scraper::ElementRef<'_>, sel: &Selector| {
        el.select(sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_owned())
            .unwrap_or_default()
    };

    let mut codes = HashMap::new();
    for entry in document.select(&list_sel) {
        let stock_code = text(entry, &stock_sel);
        if stock_code.is_empty() {
            continue;
        }
        codes.insert(
            stock_code,
            CorpInfo {
                corp_code: text(entry, &code_sel),
                corp_name: text(entry, &name_sel),
            },
        );
    }
    Ok(codes)
}

/// Classify a report name and extract its base period.
fn classify(report_name: &str) -> Option<(DartReportKind, String)> {
    if ANNUAL_KEYWORDS.iter().any(|k| report_name.contains(k)) {
        return Some((DartReportKind::Annual, annual_period(report_name)));
    }
    if QUARTERLY_KEYWORDS.iter().any(|k| report_name.contains(k)) {
        return Some((DartReportKind::Quarterly, quarterly_period(report_name)));
    }
    if MAJOR_EVENT_KEYWORDS.iter().any(|k| report_name.contains(k)) {
        return Some((DartReportKind::MajorEvent, report_name.to_owned()));
    }
    None
}

fn annual_period(name: &str) -> String {
    static YEAR: OnceLock<Option<Regex>> = OnceLock::new();
    let year = YEAR.get_or_init(|| Regex::new(r"\((\d{4})(?:\.\d{1,2})?\)").ok());
    if let Some(caps) = year.as_ref().and_then(|re| re.captures(name)) {
        return caps[1].to_owned();
    }
    if name.chars().count() >= 4 {
        name.chars().take(4).collect()
    } else {
        String::new()
    }
}

fn quarterly_period(name: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"\((\d{4}\.\d{1,2})\)",
            r"(\d{4}년?\s*[반기\d]?분기)",
            r"\((\d{4}[-\s]\d)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });
    for re in patterns {
        if let Some(caps) = re.captures(name) {
            return caps[1].trim().to_owned();
        }
    }
    name.chars().take(20).collect()
}

/// `YYYYMMDD` to `YYYY-MM-DD`; shorter input is returned unchanged.
fn format_receipt_date(raw: &str) -> String {
    match (raw.get(..4), raw.get(4..6), raw.get(6..8)) {
        (Some(y), Some(m), Some(d)) => format!("{y}-{m}-{d}"),
        _ => raw.to_owned(),
    }
}

/// Keep the five newest annual, four newest quarterly, and up to thirty
/// major-event reports from the last year, newest first.
fn select_filings(
    items: &[ListItem],
    company: &str,
    view_base: &str,
    now: DateTime<Utc>,
) -> Vec<DartFiling> {
    let mut annual = Vec::new();
    let mut quarterly = Vec::new();
    let mut major = Vec::new();

    for item in items {
        let receipt_no = item.rcept_no.trim();
        if receipt_no.is_empty() {
            continue;
        }
        let name = item.report_nm.trim();
        let Some((kind, period)) = classify(name) else {
            continue;
        };
        let filing = DartFiling {
            company: company.to_owned(),
            kind,
            period,
            filed_date: format_receipt_date(item.rcept_dt.trim()),
            url: format!("{view_base}/dsaf001/main.do?rcpNo={receipt_no}"),
        };
        match kind {
            DartReportKind::Annual => annual.push(filing),
            DartReportKind::Quarterly => quarterly.push(filing),
            DartReportKind::MajorEvent => major.push(filing),
        }
    }

    for bucket in [&mut annual, &mut quarterly, &mut major] {
        bucket.sort_by(|a, b| b.filed_date.cmp(&a.filed_date));
    }
    annual.truncate(MAX_ANNUAL);
    quarterly.truncate(MAX_QUARTERLY);

    let cutoff = (now - Duration::days(MAJOR_EVENT_WINDOW_DAYS))
        .format("%Y-%m-%d")
        .to_string();
    major.retain(|f| !f.filed_date.is_empty() && f.filed_date >= cutoff);
    major.truncate(MAX_MAJOR_EVENTS);

    let mut filings: Vec<DartFiling> = annual.into_iter().chain(quarterly).chain(major).collect();
    filings.sort_by(|a, b| b.filed_date.cmp(&a.filed_date));
    filings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const CORP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
<list><corp_code>00434003</corp_code><corp_name>다코</corp_name><stock_code> </stock_code><modify_date>20170630</modify_date></list>
<list><corp_code>00126380</corp_code><corp_name>삼성전자</corp_name><stock_code>005930</stock_code><modify_date>20240101</modify_date></list>
<list><corp_code>00164779</corp_code><corp_name>SK하이닉스</corp_name><stock_code>000660</stock_code><modify_date>20240101</modify_date></list>
</result>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().expect("valid date")
    }

    fn item(name: &str, no: &str, dt: &str) -> ListItem {
        ListItem {
            report_nm: name.into(),
            rcept_no: no.into(),
            rcept_dt: dt.into(),
        }
    }

    fn zipped(name: &str, body: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file(name, zip::write::SimpleFileOptions::default())
                .expect("start file");
            zip.write_all(body.as_bytes()).expect("write");
            zip.finish().expect("finish");
        }
        buf.into_inner()
    }

    #[test]
    fn stock_code_digits_and_padding() {
        assert_eq!(normalize_stock_code("005930").expect("valid"), "005930");
        assert_eq!(normalize_stock_code(" A005930 ").expect("valid"), "005930");
        assert_eq!(normalize_stock_code("1234567").expect("valid"), "1234567");
        assert!(matches!(
            normalize_stock_code("12345"),
            Err(FetchError::InvalidQuery(_))
        ));
    }

    #[test]
    fn corp_codes_skip_unlisted() {
        let codes = parse_corp_codes(CORP_XML).expect("parse");
        assert_eq!(codes.len(), 2);
        let samsung = codes.get("005930").expect("listed");
        assert_eq!(samsung.corp_code, "00126380");
        assert_eq!(samsung.corp_name, "삼성전자");
    }

    #[test]
    fn extract_xml_prefers_xml_entry() {
        let archive = zipped("CORPCODE.xml", CORP_XML);
        let xml = extract_xml(&archive).expect("extract");
        assert!(xml.contains("00126380"));
    }

    #[test]
    fn extract_xml_rejects_garbage() {
        assert!(matches!(extract_xml(b"not a zip"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn classify_annual_periods() {
        assert_eq!(
            classify("사업보고서 (2023.12)"),
            Some((DartReportKind::Annual, "2023".into()))
        );
        assert_eq!(
            classify("[기재정정]사업보고서 (2022)"),
            Some((DartReportKind::Annual, "2022".into()))
        );
        assert_eq!(
            classify("사업보고서"),
            Some((DartReportKind::Annual, "사업보고".into()))
        );
    }

    #[test]
    fn classify_quarterly_periods() {
        assert_eq!(
            classify("분기보고서 (2024.03)"),
            Some((DartReportKind::Quarterly, "2024.03".into()))
        );
        assert_eq!(
            classify("반기보고서 2023년 반기"),
            Some((DartReportKind::Quarterly, "반기보고서 2023년 반기".into()))
        );
        assert_eq!(
            classify("3분기보고서 2023년 3분기"),
            Some((DartReportKind::Quarterly, "2023년 3분기".into()))
        );
    }

    #[test]
    fn classify_major_event_and_others() {
        assert_eq!(
            classify("주요사항보고서(자기주식취득결정)"),
            Some((
                DartReportKind::MajorEvent,
                "주요사항보고서(자기주식취득결정)".into()
            ))
        );
        assert_eq!(classify("임원ㆍ주요주주특정증권등소유상황보고서"), None);
    }

    #[test]
    fn receipt_date_formatting() {
        assert_eq!(format_receipt_date("20240312"), "2024-03-12");
        assert_eq!(format_receipt_date("2024"), "2024");
        assert_eq!(format_receipt_date(""), "");
    }

    #[test]
    fn selection_caps_and_windows() {
        let mut items: Vec<ListItem> = (0..7)
            .map(|i| item("사업보고서 (2023.12)", &format!("A{i}"), &format!("20{}0301", 17 + i)))
            .collect();
        items.extend((0..6).map(|i| {
            item("분기보고서 (2024.03)", &format!("Q{i}"), &format!("2024010{}", i + 1))
        }));
        items.push(item("주요사항보고서(유상증자결정)", "M1", "20240501"));
        items.push(item("주요사항보고서(합병결정)", "M2", "20220501"));
        items.push(item("사업보고서 (2023.12)", "", "20240301"));

        let filings = select_filings(&items, "삼성전자", "https://dart.fss.or.kr", now());
        let count = |kind| filings.iter().filter(|f| f.kind == kind).count();
        assert_eq!(count(DartReportKind::Annual), 5);
        assert_eq!(count(DartReportKind::Quarterly), 4);
        assert_eq!(count(DartReportKind::MajorEvent), 1);

        assert_eq!(filings[0].filed_date, "2024-05-01");
        assert!(filings
            .windows(2)
            .all(|w| w[0].filed_date >= w[1].filed_date));
        assert_eq!(
            filings[0].url,
            "https://dart.fss.or.kr/dsaf001/main.do?rcpNo=M1"
        );
    }

    #[test]
    fn list_response_tolerates_missing_list() {
        let resp: ListResponse =
            serde_json::from_str(r#"{"status":"013","message":"조회된 데이타가 없습니다."}"#)
                .expect("parse");
        assert_eq!(resp.status, STATUS_NO_DATA);
        assert!(resp.list.is_empty());
    }

    #[tokio::test]
    async fn collect_without_key_is_not_configured() {
        let config = SourceConfig::default();
        let client = http::build_client(&config).expect("client");
        let source = DartSource::new(client, &config, Arc::new(crate::cache::SystemClock));
        let err = source
            .collect(&CollectRequest::new("005930", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured(_)));
    }
}
