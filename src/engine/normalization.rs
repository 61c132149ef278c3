use url::Url;

// * Normalizes a raw link into the canonical form used as the aggregation key.
// * Two links that lead to the same page must produce the same string.
// *
// * Logic:
// * 1. Trim surrounding whitespace.
// * 2. Lowercase the whole string.
// * 3. Strip trailing slashes.
// * 4. Join with the base URL of the containing article.
// * 5. Strip trailing slashes again (the url crate re-adds "/" for bare hosts).
// * 6. Lowercase the serialized form; the url crate emits upper-case percent-escapes.
// *
// * Returns None for links that cannot be resolved; callers skip them silently.
pub fn normalize_link(href: &str, base_url: Option<&str>) -> Option<String> {
    // * Steps 1-3
    let lowered = href.trim().to_lowercase();
    let cleaned = lowered.trim_end_matches('/');
    if cleaned.is_empty() {
        return None;
    }

    // * Step 4: Parse Base and Join
    // * Without a usable base only absolute links survive.
    let resolved = match base_url.and_then(|b| Url::parse(b.trim()).ok()) {
        Some(base) => base.join(cleaned).ok()?,
        None => Url::parse(cleaned).ok()?,
    };

    // ! Only web links take part in aggregation
    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str().is_none() {
        return None;
    }

    // * Steps 5-6
    // * Serialized URLs are ASCII, so this only folds hex digits in escapes
    let serialized = resolved.as_str().to_ascii_lowercase();
    if resolved.query().is_none() && resolved.fragment().is_none() {
        Some(serialized.trim_end_matches('/').to_string())
    } else {
        Some(serialized)
    }
}

// * Lowercased host of a canonical or raw absolute URL
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
