// * Hot-link discovery
// * Finds the URLs most referenced across a reader's recent articles, filters them
// * and resolves readable titles in the background.

pub mod config;
pub mod corpus;
pub mod engine;
pub mod network;
pub mod notify;
pub mod ops;
pub mod resolver;
pub mod session;

pub use config::{ConfigError, DiscoveryConfig, FilterConfig, TimeOption};
pub use corpus::{Article, Corpus, Feed, InMemoryCorpus};
pub use engine::{Aggregator, FilterPipeline, HotLink};
pub use network::{HttpFetcher, OfflineFetcher, PageFetcher};
pub use notify::{GroupSnapshot, ItemSnapshot, ResultEvent, ResultNotifier};
pub use resolver::{ResolverRules, TitleResolver};
pub use session::{DiscoveryError, HotLinkSession};
