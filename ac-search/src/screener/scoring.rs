//! Keyword relevance, quality bonus, and penalty heuristics.
//!
//! ```text
//! keyword = hit * 8 + title_hit * 6
//! bonus   = 10 if the URL ends with ".pdf"
//! penalty = 10 if 0 < title chars < 10, plus 2 if the URL contains "utm_"
//! ```

/// Most query tokens considered.
const MAX_TOKENS: usize = 8;

/// Tokens shorter than this (in chars) are ignored.
const MIN_TOKEN_CHARS: usize = 2;

/// Split a query into lowercase search tokens.
///
/// Whitespace-separated, at least two characters each, the first eight
/// kept, duplicates removed in first-seen order.
pub fn tokenize(query: &str) -> Vec<String> {
    let lowered = query.trim().to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for token in lowered
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .take(MAX_TOKENS)
    {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_owned());
        }
    }
    tokens
}

/// Keyword relevance of a title and snippet.
///
/// `hit` counts tokens found in `title + " " + snippet`, `title_hit` counts
/// tokens found in the title alone. Matching is case-insensitive substring.
pub fn keyword_score(title: &str, snippet: &str, tokens: &[String]) -> i64 {
    if tokens.is_empty() {
        return 0;
    }
    let title_lower = title.to_lowercase();
    let text = format!("{title_lower} {}", snippet.to_lowercase());

    let hit = tokens.iter().filter(|t| text.contains(t.as_str())).count();
    let title_hit = tokens
        .iter()
        .filter(|t| title_lower.contains(t.as_str()))
        .count();

    (hit as i64) * 8 + (title_hit as i64) * 6
}

/// Lowercased, trimmed title with internal whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Empty URLs and URLs carrying session identifiers are not worth keeping.
pub fn is_low_quality_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.is_empty() || lower.contains("sessionid=") || lower.contains("phpsessid=")
}

/// +10 for direct PDF links.
pub fn quality_bonus(url: &str) -> i64 {
    if url.to_lowercase().ends_with(".pdf") {
        10
    } else {
        0
    }
}

/// Penalties for very short titles and tracking-tagged URLs.
pub fn penalty(title: &str, url: &str) -> i64 {
    let mut penalty = 0;
    let title_chars = title.chars().count();
    if title_chars > 0 && title_chars < 10 {
        penalty += 10;
    }
    if url.to_lowercase().contains("utm_") {
        penalty += 2;
    }
    penalty
}
