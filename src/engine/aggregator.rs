// * Aggregation Engine
// * Walks the corpus within the recency window and groups outbound links by canonical URL

use crate::config::AggregationConfig;
use crate::corpus::Corpus;
use crate::engine::hotlink::HotLink;
use crate::engine::normalization::normalize_link;
use crate::engine::ranking::rank;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Thread-safe progress sink, receives 0..=100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Statistics of the last scan, for logging and diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub feeds_scanned: usize,
    pub articles_scanned: usize,
    pub links_seen: usize,
    pub links_skipped: usize,
    pub clusters_found: usize,
    pub clusters_kept: usize,
}

pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Scans the corpus and returns ranked clusters with at least
    /// `min_references` contributors.
    pub fn scan(
        &self,
        corpus: &dyn Corpus,
        now: DateTime<Utc>,
        progress: &dyn Fn(u8),
    ) -> (Vec<Arc<HotLink>>, ScanStats) {
        let cutoff = now - self.config.recency_window();
        let feeds = corpus.feeds();
        let total = feeds.len();

        let mut stats = ScanStats::default();
        let mut clusters: HashMap<String, HotLink> = HashMap::new();

        progress(0);

        for (index, feed) in feeds.iter().enumerate() {
            if feed.stores_history {
                stats.feeds_scanned += 1;

                for article in corpus.articles(feed) {
                    if article.published < cutoff {
                        continue;
                    }
                    stats.articles_scanned += 1;

                    let base = article.base_url();
                    for raw in article.outbound_links() {
                        stats.links_seen += 1;
                        let Some(url) = normalize_link(&raw, base) else {
                            trace!(link = %raw, "Skipping unresolvable link");
                            stats.links_skipped += 1;
                            continue;
                        };

                        clusters
                            .entry(url)
                            .or_insert_with_key(|url| HotLink::new(url.clone()))
                            .add(&article);
                    }
                }
            } else {
                debug!(feed = %feed.title, "Skipping feed without article history");
            }

            progress(percent(index + 1, total));
        }

        if total == 0 {
            progress(100);
        }

        stats.clusters_found = clusters.len();

        let mut ranked: Vec<Arc<HotLink>> = clusters
            .into_values()
            .filter(|link| link.reference_count() >= self.config.min_references)
            .map(Arc::new)
            .collect();
        rank(&mut ranked);

        stats.clusters_kept = ranked.len();

        info!(
            feeds = stats.feeds_scanned,
            articles = stats.articles_scanned,
            links = stats.links_seen,
            clusters = stats.clusters_found,
            hot = stats.clusters_kept,
            "Hot link scan complete"
        );

        (ranked, stats)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregationConfig::default())
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total).min(100) as u8
}
