// * Operations: structured logging and metrics

pub mod telemetry;

// * Re-exports for convenient access
pub use telemetry::{
    get_metrics_string, init_tracing, init_tracing_pretty, init_tracing_with_level,
    record_bytes_scanned, record_cache_lookup, record_pool_rejection, record_scan_duration,
    record_title_resolved, set_known_clusters, set_visible_clusters,
};
