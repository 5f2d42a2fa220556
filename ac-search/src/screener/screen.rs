//! The screening pipeline: filter, dedup, score, rank, truncate.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::allowlist::match_domain;
use super::dates::{parse_date, recency_score};
use super::scoring::{
    is_low_quality_url, keyword_score, normalize_title, penalty, quality_bonus, tokenize,
};
use crate::types::{Candidate, ReportItem};

/// Default cap on returned reports.
pub const DEFAULT_MAX_ITEMS: usize = 30;

/// Default age cutoff: five years.
pub const DEFAULT_MAX_AGE_DAYS: u64 = 365 * 5;

/// Screen candidates against the allowlist and rank them, using the
/// current wall-clock time for recency.
///
/// See [`screen_at`].
pub fn screen(
    query: &str,
    candidates: &[Candidate],
    max_items: usize,
    max_age_days: u64,
) -> Vec<ReportItem> {
    screen_at(query, candidates, max_items, max_age_days, Utc::now())
}

/// Screen candidates with an explicit "now".
///
/// Candidates are checked in input order; the first failing check drops
/// one. URLs are recorded as seen once they pass the allowlist, and
/// non-empty titles once they pass title dedup, even if the candidate is
/// later rejected as too old. The result is sorted by score descending
/// (stable, so ties keep input order) and truncated to `max_items`.
///
/// Never fails: missing fields read as empty and bad dates as "no date".
pub fn screen_at(
    query: &str,
    candidates: &[Candidate],
    max_items: usize,
    max_age_days: u64,
    now: DateTime<Utc>,
) -> Vec<ReportItem> {
    let tokens = tokenize(query);
    let mut seen_urls: HashSet<&str> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for candidate in candidates {
        let url = candidate.primary_url();
        if url.is_empty() || is_low_quality_url(url) {
            continue;
        }

        let Some(domain) = match_domain(url) else {
            continue;
        };

        if !seen_urls.insert(url) {
            continue;
        }

        let title = candidate.title_text();
        let snippet = candidate.snippet_text();

        let norm_title = normalize_title(title);
        if !norm_title.is_empty() && !seen_titles.insert(norm_title) {
            continue;
        }

        let published = candidate.date_text();
        let Some(recency) = recency_score(parse_date(published), now, max_age_days) else {
            continue;
        };

        let score = domain.authority
            + recency
            + keyword_score(title, snippet, &tokens)
            + quality_bonus(url)
            - penalty(title, url);

        items.push(ReportItem {
            source: domain.domain.to_owned(),
            title: title.to_owned(),
            url: url.to_owned(),
            published_date: published.to_owned(),
            snippet: snippet.to_owned(),
            score,
        });
    }

    items.sort_by(|a, b| b.score.cmp(&a.score));
    items.truncate(max_items);

    tracing::debug!(
        candidates = candidates.len(),
        kept = items.len(),
        "reports screened"
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().expect("valid date")
    }

    fn days_ago(days: i64) -> String {
        (now() - Duration::days(days)).format("%Y-%m-%d").to_string()
    }

    fn run(query: &str, candidates: &[Candidate]) -> Vec<ReportItem> {
        screen_at(query, candidates, DEFAULT_MAX_ITEMS, DEFAULT_MAX_AGE_DAYS, now())
    }

    #[test]
    fn empty_candidates_yield_empty_output() {
        assert!(run("anything", &[]).is_empty());
    }

    #[test]
    fn score_breakdown() {
        // authority 120 + recency 40 + keyword (2*8 + 2*6) + pdf 10
        let c = Candidate::with_url("https://www.bis.org/publ/arpdf/ar2024e.pdf")
            .title("Annual Economic Report")
            .published(days_ago(5));
        let out = run("annual economic", &[c]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 120 + 40 + 28 + 10);
        assert_eq!(out[0].source, "bis.org");
    }

    #[test]
    fn space_separated_datetime_earns_no_recency() {
        // authority 60 + pdf 10, date unparsed
        let c = Candidate::from_value(serde_json::json!({
            "pdf_url": "https://arxiv.org/a.pdf",
            "published_at": "2024-05-31 10:00:00+00:00",
        }));
        let out = run("", &[c]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 70);
    }

    #[test]
    fn published_date_kept_verbatim() {
        let c = Candidate::with_url("https://www.imf.org/weo")
            .title("World Economic Outlook")
            .published(" 2024/05/01 ");
        let out = run("", &[c]);
        assert_eq!(out[0].published_date, " 2024/05/01 ");
    }

    #[test]
    fn url_recorded_before_title_dedup() {
        // Second candidate reuses the URL with a new title: dropped by URL.
        // Third reuses the first title at a new URL: dropped by title.
        let a = Candidate::with_url("https://www.oecd.org/a").title("Economic Survey Korea");
        let b = Candidate::with_url("https://www.oecd.org/a").title("Something else entirely");
        let c = Candidate::with_url("https://www.oecd.org/b").title("economic  survey KOREA");
        let out = run("", &[a, b, c]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://www.oecd.org/a");
    }

    #[test]
    fn title_recorded_even_when_rejected_for_age() {
        let old = Candidate::with_url("https://www.nber.org/old")
            .title("Productivity Slowdown")
            .published(days_ago(4000));
        let fresh = Candidate::with_url("https://www.nber.org/new")
            .title("Productivity Slowdown")
            .published(days_ago(1));
        assert!(run("", &[old, fresh]).is_empty());
    }

    #[test]
    fn rejected_domain_does_not_consume_url() {
        let off_list = Candidate::with_url("https://example.com/r").title("Off list report");
        let out = run("", &[off_list]);
        assert!(out.is_empty());
    }

    #[test]
    fn session_urls_dropped() {
        let c = Candidate::with_url("https://www.bis.org/r?phpsessid=9").title("Session report");
        assert!(run("", &[c]).is_empty());
    }

    #[test]
    fn empty_titles_never_collide() {
        let a = Candidate::with_url("https://www.bis.org/a");
        let b = Candidate::with_url("https://www.bis.org/b");
        assert_eq!(run("", &[a, b]).len(), 2);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let a = Candidate::with_url("https://www.kdi.re.kr/1").title("First long title");
        let b = Candidate::with_url("https://www.nber.org/2").title("Second long title");
        let out = run("", &[a, b]);
        assert_eq!(out[0].score, out[1].score);
        assert_eq!(out[0].url, "https://www.kdi.re.kr/1");
    }

    #[test]
    fn truncates_to_max_items() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| Candidate::with_url(format!("https://www.bis.org/r{i}")))
            .collect();
        let out = screen_at("", &candidates, 3, DEFAULT_MAX_AGE_DAYS, now());
        assert_eq!(out.len(), 3);
        assert!(screen_at("", &candidates, 0, DEFAULT_MAX_AGE_DAYS, now()).is_empty());
    }

    #[test]
    fn wall_clock_variant_accepts_undated() {
        let c = Candidate::with_url("https://arxiv.org/abs/1").title("Transformers for rates");
        let out = screen("rates", &[c], DEFAULT_MAX_ITEMS, DEFAULT_MAX_AGE_DAYS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 60 + 8 + 6);
    }
}
