// * Configuration: defaults, engine limits and consumer filter settings

pub mod constants;
pub mod discovery;
pub mod filter;

pub use discovery::{AggregationConfig, DiscoveryConfig, ResolverConfig};
pub use filter::{compile_keywords, ConfigError, FilterConfig, TimeOption};
