// * Discovery engine: normalization, aggregation, ranking and filtering.
// * Everything here is synchronous and single-threaded; the session runs it off the consumer thread.

pub mod aggregator;
pub mod filter;
pub mod hotlink;
pub mod normalization;
pub mod ranking;

pub use aggregator::{Aggregator, ProgressFn, ScanStats};
pub use filter::{article_passes, ExclusionCriterion, FilterPipeline, VisibleCluster};
pub use hotlink::HotLink;
pub use normalization::{host_of, normalize_link};
pub use ranking::{compare_hotness, rank};
