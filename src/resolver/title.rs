// * Title Resolver
// * Cache first, then custom resolvers, then a bounded streaming fetch of the page head.
// * Resolution runs on the worker pool; completions go to the dispatcher, never to the consumer.

use crate::config::constants::UNRESOLVED_PREFIX;
use crate::config::ResolverConfig;
use crate::network::{NetworkError, PageFetcher};
use crate::notify::{NotifierHandle, ResultGroup};
use crate::ops::telemetry;
use crate::resolver::cache::{PressureMonitor, TitleCache};
use crate::resolver::pool::WorkerPool;
use crate::resolver::rules::ResolverRules;
use crate::resolver::scanner::scan_stream;
use futures::FutureExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Title used when nothing better could be determined.
pub fn fallback_title(url: &str) -> String {
    format!("{} {}", UNRESOLVED_PREFIX, url)
}

struct Shared {
    config: ResolverConfig,
    rules: ResolverRules,
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<TitleCache>,
    notifier: NotifierHandle,
    token: CancellationToken,
}

pub struct TitleResolver {
    shared: Arc<Shared>,
    pool: WorkerPool,
}

impl TitleResolver {
    /// Creates a resolver with its own cache. Must be called inside a tokio runtime.
    pub fn new(
        config: ResolverConfig,
        rules: ResolverRules,
        fetcher: Arc<dyn PageFetcher>,
        notifier: NotifierHandle,
        token: CancellationToken,
    ) -> Self {
        let cache = Arc::new(TitleCache::new(config.cache_capacity));
        Self::with_cache(config, rules, fetcher, notifier, token, cache)
    }

    /// Creates a resolver sharing `cache` with other resolvers.
    pub fn with_cache(
        config: ResolverConfig,
        rules: ResolverRules,
        fetcher: Arc<dyn PageFetcher>,
        notifier: NotifierHandle,
        token: CancellationToken,
        cache: Arc<TitleCache>,
    ) -> Self {
        let pool = WorkerPool::new(config.workers, config.queue_capacity, token.clone());

        if config.purge_on_memory_pressure {
            Arc::new(PressureMonitor::new()).spawn(Arc::clone(&cache), token.clone());
        }

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            scan_limit = config.default_scan_limit,
            "Title resolver started"
        );

        Self {
            shared: Arc::new(Shared {
                config,
                rules,
                fetcher,
                cache,
                notifier,
                token,
            }),
            pool,
        }
    }

    /// Returns the title to display for `group` right now.
    ///
    /// A cached title is returned synchronously and marks the group resolved.
    /// Otherwise the current display name is returned and, for a visible group
    /// not already being resolved, a resolution task is queued.
    pub fn resolve(&self, group: &Arc<ResultGroup>) -> String {
        let link = group.link();

        if let Some(title) = self.shared.cache.get(link.url()) {
            let changed = link.title().as_deref() != Some(title.as_str());
            link.set_title(title.as_str());
            group.mark_resolved();
            if changed {
                self.shared.notifier.group_updated(group.snapshot());
            }
            return title;
        }

        let display = link.display_name();

        if self.shared.token.is_cancelled() || !group.is_visible() {
            return display;
        }
        if !group.try_begin_resolving() {
            return display;
        }

        let job = Self::run(Arc::clone(&self.shared), Arc::clone(group)).boxed();
        if let Err(e) = self.pool.submit(job) {
            warn!(url = %link.url(), error = %e, "Title resolution not scheduled");
            telemetry::record_pool_rejection();
            group.reset_resolution();
        }

        display
    }

    async fn run(shared: Arc<Shared>, group: Arc<ResultGroup>) {
        let url = group.url().to_string();

        if shared.token.is_cancelled() {
            return;
        }
        // * Hidden since scheduling
        if !group.is_visible() {
            debug!(url = %url, "Skipping resolution of hidden group");
            group.reset_resolution();
            return;
        }

        let title = match shared.rules.custom_title(&url) {
            Some(title) => {
                telemetry::record_title_resolved("custom");
                title
            }
            None => match shared.fetch_title(&url).await {
                Ok(Some(raw)) => {
                    let title = shared.rules.post_process(&raw);
                    if title.is_empty() {
                        telemetry::record_title_resolved("fallback");
                        fallback_title(&url)
                    } else {
                        telemetry::record_title_resolved("fetched");
                        title
                    }
                }
                Ok(None) => {
                    telemetry::record_title_resolved("fallback");
                    fallback_title(&url)
                }
                Err(NetworkError::Cancelled) => {
                    group.reset_resolution();
                    return;
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "Title fetch failed");
                    telemetry::record_title_resolved("error");
                    fallback_title(&url)
                }
            },
        };

        if shared.token.is_cancelled() {
            group.reset_resolution();
            return;
        }

        shared.cache.put(&url, &title);
        group.link().set_title(title.as_str());
        group.mark_resolved();
        debug!(url = %url, title = %title, "Title resolved");
        shared.notifier.group_updated(group.snapshot());
    }

    pub fn cache(&self) -> &Arc<TitleCache> {
        &self.shared.cache
    }

    pub fn rules(&self) -> &ResolverRules {
        &self.shared.rules
    }

    /// Tasks queued but not yet started
    pub fn pending(&self) -> usize {
        self.pool.pending()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    // * Aborts in-flight reads and turns queued tasks into no-ops
    pub fn stop(&self) {
        if !self.shared.token.is_cancelled() {
            info!("Title resolver stopping");
        }
        self.pool.shutdown();
    }
}

impl Shared {
    async fn fetch_title(&self, url: &str) -> Result<Option<String>, NetworkError> {
        let page = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(NetworkError::Cancelled),
            page = self.fetcher.open(url) => page?,
        };

        if !page.is_html() {
            debug!(url = %url, content_type = ?page.content_type, "Not HTML; title not scanned");
            return Ok(None);
        }

        let limit = self
            .rules
            .scan_limit_for(url, self.config.default_scan_limit);
        let encoding = page.encoding();
        scan_stream(page.body, limit, encoding, &self.token).await
    }
}

impl std::fmt::Debug for TitleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleResolver")
            .field("config", &self.shared.config)
            .field("rules", &self.shared.rules)
            .field("cache", &self.shared.cache)
            .field("pool", &self.pool)
            .finish()
    }
}
