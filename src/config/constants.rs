// * Configuration Constants
// * Central location for all configurable thresholds, limits and timeouts

// * Articles older than this (relative to scan time) are not aggregated
pub const RECENCY_WINDOW_DAYS: i64 = 7;

// * A cluster referenced by fewer articles is never "hot"
pub const MIN_REFERENCES: usize = 2;

// * Upper bound on clusters pushed to the consumer after a review pass
pub const MAX_DISPLAYED_CLUSTERS: usize = 20;

// * Minimum feed rating value meaning "no rating filter"
pub const RATING_UNFILTERED: i32 = 1;

// * Feed rating value meaning "not rated"
pub const RATING_UNRATED: i32 = -1;

// * Title resolver worker pool size
pub const RESOLVER_WORKERS: usize = 5;

// * Pending resolution tasks before new requests are dropped
pub const RESOLVER_QUEUE_CAPACITY: usize = 1000;

// * Bytes scanned for an opening <title> tag unless a pattern overrides it
pub const DEFAULT_SCAN_LIMIT: usize = 2000;

// * Hard cap on title bytes collected after the opening tag
pub const MAX_TITLE_BYTES: usize = 1024;

// * Network timeouts for title fetches
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// * Resolved titles kept in memory
pub const TITLE_CACHE_CAPACITY: usize = 2048;

// * Prefix of the display name used when no title could be obtained
pub const UNRESOLVED_PREFIX: &str = "[Unresolved]";

// * User agent presented to remote sites
pub const USER_AGENT: &str = "Hotlinks/0.1 (+title resolver)";
