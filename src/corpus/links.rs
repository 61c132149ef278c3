// * Outbound link extraction from article HTML
// * Used when a feed supplies article bodies instead of an explicit link list

use regex::Regex;
use std::sync::LazyLock;

// * Anchor href attribute, single or double quoted
static PATTERN_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("Invalid href regex")
});

// * Schemes that never point at a readable page
const SKIPPED_SCHEMES: &[&str] = &["mailto:", "javascript:", "tel:", "data:"];

/// Extracts the raw `href` values of every anchor in `html`, in document order.
///
/// Values are returned as written; resolution against the article URL is the
/// normalizer's job. Fragment-only anchors and non-navigational schemes are dropped.
pub fn extract_links(html: &str) -> Vec<String> {
    PATTERN_HREF
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter(|href| {
            let lower = href.to_ascii_lowercase();
            !SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s))
        })
        .map(str::to_string)
        .collect()
}
