//! Date parsing and recency scoring for report candidates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Date-only layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parse a candidate date string.
///
/// Tries, in order: `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`,
/// `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM:SS±HHMM`,
/// `YYYY-MM-DDTHH:MM:SS.ffffff±HHMM`, then RFC 3339 with a `T` separator.
/// Values without an offset are taken as UTC. Blank or unrecognised input yields `None`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // RFC 3339 also admits a space separator; only `T` is accepted here.
    if !matches!(s.as_bytes().get(10), Some(b'T' | b't')) {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole days between `published` and `now`, floored and clamped at zero.
///
/// Future dates count as age 0.
pub fn age_in_days(published: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
        .max(0)
}

/// Recency contribution for a parsed date.
///
/// - No date: `Some(0)`
/// - Older than `max_age_days`: `None`, the candidate is rejected
/// - Otherwise `max(0, 40 - floor(age / 30) * 5)`
pub fn recency_score(
    published: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_age_days: u64,
) -> Option<i64> {
    let Some(published) = published else {
        return Some(0);
    };
    let age = age_in_days(published, now);
    if u64::try_from(age).unwrap_or(0) > max_age_days {
        return None;
    }
    Some((40 - (age / 30) * 5).max(0))
}
