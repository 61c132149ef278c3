// * Title cache shared by every resolution task of a resolver
// * Optional memory pressure monitor purges it when system RAM runs high

use crate::ops::telemetry;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// * Memory pressure thresholds (percentage)
const PRESSURE_THRESHOLD_HIGH: f64 = 90.0;
const PRESSURE_THRESHOLD_LOW: f64 = 85.0;
const MONITOR_INTERVAL_SECS: u64 = 5;

/// Bounded URL -> title map. Least recently used titles are evicted first.
pub struct TitleCache {
    entries: Mutex<LruCache<String, String>>,
}

impl TitleCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let hit = self.entries.lock().get(url).cloned();
        telemetry::record_cache_lookup(hit.is_some());
        hit
    }

    pub fn put(&self, url: &str, title: &str) {
        self.entries.lock().put(url.to_string(), title.to_string());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.lock().contains(url)
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let purged = entries.len();
        entries.clear();
        debug!(purged, "Title cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TitleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleCache").field("len", &self.len()).finish()
    }
}

/// Tracks system RAM usage with hysteresis (enters at 90%, exits at 85%).
pub struct PressureMonitor {
    under_pressure: AtomicBool,
    system: Mutex<System>,
}

impl PressureMonitor {
    pub fn new() -> Self {
        Self {
            under_pressure: AtomicBool::new(false),
            system: Mutex::new(System::new()),
        }
    }

    pub fn is_under_pressure(&self) -> bool {
        self.under_pressure.load(Ordering::Relaxed)
    }

    /// Applies one RAM sample. Returns true when this sample entered the pressure state.
    pub fn evaluate(&self, ram_percent: f64) -> bool {
        let current = self.is_under_pressure();

        if ram_percent > PRESSURE_THRESHOLD_HIGH && !current {
            self.under_pressure.store(true, Ordering::Relaxed);
            warn!(
                "Memory pressure ACTIVATED - RAM at {:.1}% (threshold: {}%)",
                ram_percent, PRESSURE_THRESHOLD_HIGH
            );
            return true;
        }

        if ram_percent < PRESSURE_THRESHOLD_LOW && current {
            self.under_pressure.store(false, Ordering::Relaxed);
            info!(
                "Memory pressure RELEASED - RAM at {:.1}% (threshold: {}%)",
                ram_percent, PRESSURE_THRESHOLD_LOW
            );
        }
        false
    }

    fn ram_usage_percent(&self) -> f64 {
        let mut system = self.system.lock();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        (system.used_memory() as f64 / total as f64) * 100.0
    }

    // * Polls RAM until `token` is cancelled; every entry into pressure purges `cache`
    pub fn spawn(
        self: Arc<Self>,
        cache: Arc<TitleCache>,
        token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(MONITOR_INTERVAL_SECS));
            debug!("PressureMonitor started - polling every {}s", MONITOR_INTERVAL_SECS);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {}
                }

                let percent = self.ram_usage_percent();
                if self.evaluate(percent) {
                    cache.clear();
                }
            }
            debug!("PressureMonitor stopped");
        })
    }
}

impl Default for PressureMonitor {
    fn default() -> Self {
        Self::new()
    }
}
