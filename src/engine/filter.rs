// * Filter Pipeline
// * Independent predicates over clusters and their member articles, evaluated from scratch
// * on every review so the visible set is a pure function of (clusters, config, now)

use crate::config::constants::{MIN_REFERENCES, RATING_UNFILTERED};
use crate::config::FilterConfig;
use crate::corpus::Article;
use crate::engine::hotlink::HotLink;
use crate::engine::normalization::host_of;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Custom exclusion rule. Returning true hides the cluster.
///
/// Receives the cluster and the contributors that survived article filtering.
pub type ExclusionCriterion = Arc<dyn Fn(&HotLink, &[Arc<Article>]) -> bool + Send + Sync>;

/// A cluster that passed the pipeline together with its visible contributors.
#[derive(Debug, Clone)]
pub struct VisibleCluster {
    pub link: Arc<HotLink>,
    pub articles: Vec<Arc<Article>>,
}

#[derive(Clone)]
pub struct FilterPipeline {
    min_references: usize,
    criteria: Vec<ExclusionCriterion>,
}

impl FilterPipeline {
    pub fn new(min_references: usize) -> Self {
        Self {
            min_references,
            criteria: Vec::new(),
        }
    }

    /// Registers an exclusion criterion for the lifetime of this pipeline
    pub fn add_criterion<F>(&mut self, criterion: F)
    where
        F: Fn(&HotLink, &[Arc<Article>]) -> bool + Send + Sync + 'static,
    {
        self.criteria.push(Arc::new(criterion));
    }

    pub fn clear_criteria(&mut self) {
        self.criteria.clear();
    }

    pub fn criteria_count(&self) -> usize {
        self.criteria.len()
    }

    /// Returns the visible clusters in input order.
    pub fn apply(
        &self,
        clusters: &[Arc<HotLink>],
        config: &FilterConfig,
        now: DateTime<Utc>,
    ) -> Vec<VisibleCluster> {
        let visible: Vec<VisibleCluster> = clusters
            .iter()
            .filter_map(|link| self.evaluate(link, config, now))
            .collect();

        debug!(
            known = clusters.len(),
            visible = visible.len(),
            "Filter pipeline applied"
        );

        visible
    }

    /// Evaluates a single cluster; None when it is hidden.
    pub fn evaluate(
        &self,
        link: &Arc<HotLink>,
        config: &FilterConfig,
        now: DateTime<Utc>,
    ) -> Option<VisibleCluster> {
        if config.is_ignored(link.url()) {
            return None;
        }

        let link_host = host_of(link.url());
        let articles: Vec<Arc<Article>> = link
            .articles()
            .iter()
            .filter(|a| article_passes(config, link_host.as_deref(), a, now))
            .cloned()
            .collect();

        if articles.len() < self.min_references {
            return None;
        }

        // * Evaluated on the surviving contributors, not the original set
        if config.suppress_single_source && distinct_feeds(&articles) < 2 {
            return None;
        }

        if self.criteria.iter().any(|c| c(&**link, articles.as_slice())) {
            return None;
        }

        Some(VisibleCluster {
            link: Arc::clone(link),
            articles,
        })
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(MIN_REFERENCES)
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("min_references", &self.min_references)
            .field("criteria", &self.criteria.len())
            .finish()
    }
}

/// Article-level predicates. `link_host` is the host of the cluster URL.
pub fn article_passes(
    config: &FilterConfig,
    link_host: Option<&str>,
    article: &Article,
    now: DateTime<Utc>,
) -> bool {
    if config.unread_only && article.read {
        return false;
    }

    if let Some(max_age) = config.time_option.max_age() {
        if article.published < now - max_age {
            return false;
        }
    }

    if config.min_rating > RATING_UNFILTERED && article.feed.rating < config.min_rating {
        return false;
    }

    if config.suppress_self_references {
        let own_host = article.base_url().and_then(host_of);
        if own_host.is_some() && own_host.as_deref() == link_host {
            return false;
        }
    }

    if let Some(guide) = &config.target_guide {
        if !article.feed.belongs_to(guide) {
            return false;
        }
    }

    true
}

fn distinct_feeds(articles: &[Arc<Article>]) -> usize {
    articles
        .iter()
        .map(|a| a.feed.id)
        .collect::<HashSet<_>>()
        .len()
}
