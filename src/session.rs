// * Discovery session
// * Wires aggregation, filtering, title resolution and result delivery into one object

use crate::config::{ConfigError, DiscoveryConfig, FilterConfig};
use crate::corpus::{Article, Corpus, CorpusError};
use crate::engine::{Aggregator, FilterPipeline, HotLink, ProgressFn, ScanStats};
use crate::network::{NetworkError, PageFetcher};
use crate::notify::{spawn_dispatcher, GroupSnapshot, NotifierHandle, ResultGroup, ResultNotifier, ResultSet};
use crate::ops::telemetry;
use crate::resolver::{ResolverRules, TitleResolver};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Discovery session has been stopped")]
    Stopped,

    #[error("Background scan failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

struct SessionCore {
    config: DiscoveryConfig,
    aggregator: Aggregator,
    pipeline: RwLock<FilterPipeline>,
    filter: RwLock<FilterConfig>,
    clusters: RwLock<Vec<Arc<HotLink>>>,
    results: ResultSet,
    resolver: TitleResolver,
    notifier: NotifierHandle,
    token: CancellationToken,
    // ! Held for a whole review so clear-then-rebuild sequences never interleave
    review_guard: Mutex<()>,
}

/// One discovery session over a corpus.
///
/// `scan` aggregates and reviews on a blocking thread, `set_filter` re-reviews the
/// clusters already known, `stop` ends title resolution. Results reach the consumer
/// only through its [`ResultNotifier`].
pub struct HotLinkSession {
    core: Arc<SessionCore>,
    dispatcher: JoinHandle<()>,
}

impl HotLinkSession {
    /// Starts a session delivering results to `notifier`. Must be called inside a tokio runtime.
    pub fn new<N: ResultNotifier>(
        config: DiscoveryConfig,
        rules: ResolverRules,
        fetcher: Arc<dyn PageFetcher>,
        notifier: N,
    ) -> Self {
        let token = CancellationToken::new();
        let (handle, task) = spawn_dispatcher(notifier, token.clone());
        let dispatcher = tokio::spawn(async move {
            let _ = task.await;
        });

        let resolver = TitleResolver::new(
            config.resolver.clone(),
            rules,
            fetcher,
            handle.clone(),
            token.clone(),
        );

        let core = SessionCore {
            aggregator: Aggregator::new(config.aggregation.clone()),
            pipeline: RwLock::new(FilterPipeline::new(config.aggregation.min_references)),
            filter: RwLock::new(FilterConfig::default()),
            clusters: RwLock::new(Vec::new()),
            results: ResultSet::new(),
            resolver,
            notifier: handle,
            token,
            review_guard: Mutex::new(()),
            config,
        };

        Self {
            core: Arc::new(core),
            dispatcher,
        }
    }

    pub fn with_filter(self, filter: FilterConfig) -> Self {
        *self.core.filter.write() = filter;
        self
    }

    /// Registers a custom exclusion criterion; takes effect at the next review.
    pub fn add_criterion<F>(&self, criterion: F)
    where
        F: Fn(&HotLink, &[Arc<Article>]) -> bool + Send + Sync + 'static,
    {
        self.core.pipeline.write().add_criterion(criterion);
    }

    pub fn clear_criteria(&self) {
        self.core.pipeline.write().clear_criteria();
    }

    /// Aggregates `corpus` and reviews the result as one background unit.
    pub async fn scan(
        &self,
        corpus: Arc<dyn Corpus>,
        progress: ProgressFn,
    ) -> Result<ScanStats, DiscoveryError> {
        self.ensure_running()?;
        let core = Arc::clone(&self.core);
        let stats = tokio::task::spawn_blocking(move || {
            let _guard = core.review_guard.lock();
            let stats = core.aggregate(corpus.as_ref(), progress.as_ref());
            core.review_locked();
            stats
        })
        .await?;
        Ok(stats)
    }

    /// Replaces the filter configuration and reviews the known clusters.
    ///
    /// Returns the number of visible clusters.
    pub async fn set_filter(&self, filter: FilterConfig) -> Result<usize, DiscoveryError> {
        self.ensure_running()?;
        let core = Arc::clone(&self.core);
        Ok(tokio::task::spawn_blocking(move || {
            let _guard = core.review_guard.lock();
            *core.filter.write() = filter;
            core.review_locked()
        })
        .await?)
    }

    /// Re-filters the known clusters from scratch without re-scanning.
    pub async fn review(&self) -> Result<usize, DiscoveryError> {
        self.ensure_running()?;
        let core = Arc::clone(&self.core);
        Ok(tokio::task::spawn_blocking(move || {
            let _guard = core.review_guard.lock();
            core.review_locked()
        })
        .await?)
    }

    pub fn filter(&self) -> FilterConfig {
        self.core.filter.read().clone()
    }

    pub fn visible(&self) -> Vec<GroupSnapshot> {
        self.core
            .results
            .visible()
            .iter()
            .map(|g| g.snapshot())
            .collect()
    }

    /// Clusters produced by the last scan, ranked
    pub fn clusters(&self) -> Vec<Arc<HotLink>> {
        self.core.clusters.read().clone()
    }

    pub fn resolver(&self) -> &TitleResolver {
        &self.core.resolver
    }

    pub fn is_stopped(&self) -> bool {
        self.core.token.is_cancelled()
    }

    // * Cancels resolution; no group update reaches the consumer afterwards
    pub fn stop(&self) {
        self.core.resolver.stop();
        self.core.token.cancel();
    }

    /// Stops the session and waits until every queued event has been delivered.
    pub async fn shutdown(self) {
        self.stop();
        let Self { core, dispatcher } = self;
        drop(core);
        let _ = dispatcher.await;
    }

    fn ensure_running(&self) -> Result<(), DiscoveryError> {
        if self.is_stopped() {
            return Err(DiscoveryError::Stopped);
        }
        Ok(())
    }
}

impl SessionCore {
    fn aggregate(&self, corpus: &dyn Corpus, progress: &(dyn Fn(u8) + Send + Sync)) -> ScanStats {
        let started = Instant::now();
        let (clusters, stats) = self.aggregator.scan(corpus, Utc::now(), progress);
        telemetry::record_scan_duration(started.elapsed().as_secs_f64());
        telemetry::set_known_clusters(clusters.len());

        self.results.retain_urls(&clusters);
        *self.clusters.write() = clusters;
        stats
    }

    // * Clear-then-rebuild of the visible set, capped at max_displayed
    // * Caller holds review_guard
    fn review_locked(&self) -> usize {
        let filter = self.filter.read().clone();
        let clusters = self.clusters.read().clone();

        let visible = self.pipeline.read().apply(&clusters, &filter, Utc::now());
        let total_visible = visible.len();

        let groups: Vec<Arc<ResultGroup>> = visible
            .into_iter()
            .take(self.config.max_displayed)
            .map(|cluster| {
                let group = self.results.group_for(&cluster.link);
                group.set_items(cluster.articles);
                group
            })
            .collect();

        self.results.replace_visible(groups.clone());
        telemetry::set_visible_clusters(groups.len());

        self.notifier.clear();
        for group in &groups {
            self.notifier.group_added(group.snapshot());
            for item in group.item_snapshots() {
                self.notifier.item_added(group.seq(), item);
            }
        }

        // * Groups are announced before any resolution can report on them
        for group in &groups {
            self.resolver.resolve(group);
        }

        info!(
            known = clusters.len(),
            passed = total_visible,
            shown = groups.len(),
            "Review complete"
        );
        debug!(pending = self.resolver.pending(), "Title resolutions queued");

        groups.len()
    }
}

impl std::fmt::Debug for HotLinkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotLinkSession")
            .field("config", &self.core.config)
            .field("clusters", &self.core.clusters.read().len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
