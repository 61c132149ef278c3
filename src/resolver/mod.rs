// * Title Resolver: cache, custom rules, streaming title scan and the bounded worker pool

pub mod cache;
pub mod pool;
pub mod rules;
pub mod scanner;
pub mod title;

pub use cache::{PressureMonitor, TitleCache};
pub use pool::{PoolError, WorkerPool};
pub use rules::{CustomResolver, ResolverRules, RewriteRule};
pub use scanner::{scan_stream, scan_title, TitleScanner};
pub use title::{fallback_title, TitleResolver};
