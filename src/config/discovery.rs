// * Engine limits: aggregation window, resolver pool, cache and network bounds

use crate::config::constants::*;
use crate::config::filter::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Articles older than this many days are not scanned
    pub recency_window_days: i64,
    /// Clusters with fewer contributors are dropped before filtering
    pub min_references: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            recency_window_days: RECENCY_WINDOW_DAYS,
            min_references: MIN_REFERENCES,
        }
    }
}

impl AggregationConfig {
    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.recency_window_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub default_scan_limit: usize,
    pub cache_capacity: usize,
    pub connect_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
    /// Purge the title cache when system memory runs low
    pub purge_on_memory_pressure: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: RESOLVER_WORKERS,
            queue_capacity: RESOLVER_QUEUE_CAPACITY,
            default_scan_limit: DEFAULT_SCAN_LIMIT,
            cache_capacity: TITLE_CACHE_CAPACITY,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
            user_agent: USER_AGENT.to_string(),
            purge_on_memory_pressure: false,
        }
    }
}

impl ResolverConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub aggregation: AggregationConfig,
    pub resolver: ResolverConfig,
    /// Visible clusters pushed to the consumer per review
    pub max_displayed: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig::default(),
            resolver: ResolverConfig::default(),
            max_displayed: MAX_DISPLAYED_CLUSTERS,
        }
    }
}

impl DiscoveryConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
