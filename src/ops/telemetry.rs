// * Telemetry - JSON Logging and Prometheus Metrics
// * Structured logging setup plus counters for scanning, filtering and title resolution

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    // * Titles by outcome: fetched, custom, fallback, error
    pub static ref TITLES_RESOLVED_TOTAL: CounterVec = register_counter_vec!(
        "hotlinks_titles_resolved_total",
        "Total titles resolved by outcome",
        &["outcome"]
    ).unwrap();

    // * Cache lookups by result
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "hotlinks_title_cache_lookups_total",
        "Title cache lookups by result",
        &["result"]
    ).unwrap();

    // * Resolution tasks rejected by the worker pool
    pub static ref POOL_REJECTIONS_TOTAL: Counter = register_counter!(
        "hotlinks_pool_rejections_total",
        "Resolution tasks dropped because the queue was full or shut down"
    ).unwrap();

    // * Bytes examined while searching for <title>
    pub static ref BYTES_SCANNED_TOTAL: Counter = register_counter!(
        "hotlinks_bytes_scanned_total",
        "Total bytes examined by the title scanner"
    ).unwrap();

    // * Clusters currently presented to the consumer
    pub static ref VISIBLE_CLUSTERS: Gauge = register_gauge!(
        "hotlinks_visible_clusters",
        "Number of clusters in the visible set"
    ).unwrap();

    // * Clusters kept by the last aggregation scan
    pub static ref KNOWN_CLUSTERS: Gauge = register_gauge!(
        "hotlinks_known_clusters",
        "Number of clusters produced by the last scan"
    ).unwrap();

    // * Aggregation scan duration
    pub static ref SCAN_DURATION_SECONDS: Histogram = register_histogram!(
        "hotlinks_scan_duration_seconds",
        "Corpus aggregation duration in seconds",
        vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();
}

/// Initializes the tracing subscriber with JSON formatting
///
/// # Example
/// ```ignore
/// use hotlinks::ops::telemetry;
///
/// telemetry::init_tracing();
/// tracing::info!(url = "https://example.com", "Resolving title");
/// ```
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initializes tracing with custom log level
pub fn init_tracing_with_level(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

/// Initializes tracing with pretty formatting (for development)
pub fn init_tracing_pretty() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().pretty().with_writer(std::io::stderr))
        .init();
}

/// Returns the current metrics in the Prometheus text format
pub fn get_metrics_string() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Records a resolved title
pub fn record_title_resolved(outcome: &str) {
    TITLES_RESOLVED_TOTAL.with_label_values(&[outcome]).inc();
}

/// Records a title cache lookup
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_pool_rejection() {
    POOL_REJECTIONS_TOTAL.inc();
}

pub fn record_bytes_scanned(bytes: u64) {
    BYTES_SCANNED_TOTAL.inc_by(bytes as f64);
}

pub fn set_visible_clusters(count: usize) {
    VISIBLE_CLUSTERS.set(count as f64);
}

pub fn set_known_clusters(count: usize) {
    KNOWN_CLUSTERS.set(count as f64);
}

/// Records an aggregation scan duration
pub fn record_scan_duration(seconds: f64) {
    SCAN_DURATION_SECONDS.observe(seconds);
}
