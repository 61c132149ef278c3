// * Hotness ordering of clusters
// * Pure function of HotLink state so re-ranking never needs hidden counters

use crate::engine::hotlink::HotLink;
use std::cmp::Ordering;
use std::sync::Arc;

/// Compares two clusters, hottest first.
///
/// 1. More contributors first.
/// 2. Higher average contributing-feed rating first.
/// 3. Canonical URL, case-insensitive, ascending.
pub fn compare_hotness(a: &HotLink, b: &HotLink) -> Ordering {
    b.reference_count()
        .cmp(&a.reference_count())
        .then_with(|| compare_average_rating(b, a))
        .then_with(|| a.url().to_lowercase().cmp(&b.url().to_lowercase()))
}

// * Exact average comparison via cross-multiplication: x/n vs y/m  <=>  x*m vs y*n
fn compare_average_rating(a: &HotLink, b: &HotLink) -> Ordering {
    match (a.ratings_count(), b.ratings_count()) {
        (0, 0) => Ordering::Equal,
        (0, _) => 0.cmp(&b.cumulative_rating().signum()),
        (_, 0) => a.cumulative_rating().signum().cmp(&0),
        (n, m) => {
            let lhs = a.cumulative_rating() * i64::from(m);
            let rhs = b.cumulative_rating() * i64::from(n);
            lhs.cmp(&rhs)
        }
    }
}

/// Sorts clusters in place, hottest first. The sort is stable.
pub fn rank(links: &mut [Arc<HotLink>]) {
    links.sort_by(|a, b| compare_hotness(a, b));
}
