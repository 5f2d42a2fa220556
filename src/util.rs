//! Query helpers shared by the research service and the HTTP layer.

/// Characters replaced by `_` in slugs, besides whitespace.
const SLUG_SEPARATORS: &[char] = &['/', '\\', ':', '?', '"', '\'', '*', '<', '>', '|'];

/// Filename-safe slug for a query.
///
/// Lowercases, turns whitespace and path/shell metacharacters into `_`,
/// collapses repeats, and trims `_` from both ends. Empty results become
/// `"research"`.
///
/// # Examples
///
/// ```
/// use ac_research::util::slugify;
///
/// assert_eq!(slugify("  Apple Inc / AAPL "), "apple_inc_aapl");
/// assert_eq!(slugify("???"), "research");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().to_lowercase().chars() {
        if c == '_' || c.is_whitespace() || SLUG_SEPARATORS.contains(&c) {
            if !slug.ends_with('_') {
                slug.push('_');
            }
        } else {
            slug.push(c);
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "research".to_owned()
    } else {
        slug.to_owned()
    }
}

/// True if the query looks like a Korean stock code: six or more ASCII digits
/// anywhere in it.
pub fn is_korea_stock(query: &str) -> bool {
    query.chars().filter(char::is_ascii_digit).count() >= 6
}
