//! URL canonicalisation for news deduplication.
//!
//! Two article links that differ only in tracking parameters, fragments, or
//! host capitalisation compare equal after [`canonical_url`].

use url::Url;

/// Exact query keys treated as tracking parameters, besides any `utm_*` key.
const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid"];

/// Canonicalise a URL for deduplication comparison.
///
/// Applies the following transformations:
///
/// 1. Lowercase scheme and host (path is preserved as-is).
/// 2. Remove the fragment (`#…`).
/// 3. Drop query parameters whose key starts with `utm_` or equals `gclid`
///    or `fbclid`, case-insensitively. Remaining parameters keep their order
///    and encoding.
///
/// Trailing slashes are kept. Input that does not parse as an absolute URL
/// is returned trimmed.
///
/// # Examples
///
/// ```
/// use ac_search::url_normalize::canonical_url;
///
/// let a = canonical_url("https://News.Example.com/a?id=7&utm_source=x#top");
/// assert_eq!(a, "https://news.example.com/a?id=7");
/// ```
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    parsed.set_fragment(None);

    let kept: Option<String> = parsed.query().map(|query| {
        query
            .split('&')
            .filter(|pair| !pair.is_empty() && !is_tracking_pair(pair))
            .collect::<Vec<_>>()
            .join("&")
    });

    match kept {
        Some(q) if !q.is_empty() => parsed.set_query(Some(&q)),
        _ => parsed.set_query(None),
    }

    parsed.to_string()
}

fn is_tracking_pair(pair: &str) -> bool {
    let key = pair.split('=').next().unwrap_or_default().to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
