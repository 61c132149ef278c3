use clap::Parser;
use hotlinks::config::{DiscoveryConfig, FilterConfig, TimeOption};
use hotlinks::corpus::InMemoryCorpus;
use hotlinks::network::{HttpFetcher, OfflineFetcher, PageFetcher};
use hotlinks::notify::{GroupSnapshot, ItemSnapshot, ResultNotifier};
use hotlinks::ops::telemetry;
use hotlinks::resolver::ResolverRules;
use hotlinks::session::{DiscoveryError, HotLinkSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Lists the links most referenced across recent articles of a corpus.
#[derive(Parser, Debug)]
#[command(name = "hotlinks", version, about)]
struct Cli {
    /// Corpus JSON document (feeds with their articles)
    #[arg(long)]
    corpus: PathBuf,

    /// Engine configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// all, today or week
    #[arg(long, default_value = "all")]
    time_option: TimeOption,

    /// Minimum feed rating, 1 disables rating filtering
    #[arg(long, default_value_t = 1)]
    min_rating: i32,

    #[arg(long)]
    unread_only: bool,

    /// Hide references from the linked site itself
    #[arg(long)]
    suppress_self: bool,

    /// Hide links referenced by a single feed only
    #[arg(long)]
    suppress_single_source: bool,

    /// Ignore keywords, comma separated, `*` as wildcard
    #[arg(long)]
    ignore: Option<String>,

    /// Restrict to feeds of this guide
    #[arg(long)]
    guide: Option<String>,

    /// Never fetch pages; every title falls back
    #[arg(long)]
    offline: bool,

    /// Seconds to wait for titles before printing
    #[arg(long, default_value_t = 15)]
    wait_secs: u64,

    /// Human-readable logs instead of JSON
    #[arg(long)]
    pretty: bool,

    /// Print Prometheus metrics after the results
    #[arg(long)]
    metrics: bool,
}

// * Streams result events to stderr as they arrive
struct ConsoleNotifier;

impl ResultNotifier for ConsoleNotifier {
    fn clear(&mut self) {
        eprintln!("-- results cleared");
    }

    fn group_added(&mut self, group: GroupSnapshot) {
        eprintln!(
            "+ #{} [{}/{} refs] {}",
            group.seq, group.shown_references, group.reference_count, group.url
        );
    }

    fn item_added(&mut self, group_seq: u64, item: ItemSnapshot) {
        eprintln!("    #{} <- {} ({})", group_seq, item.title, item.feed_title);
    }

    fn group_updated(&mut self, group: GroupSnapshot) {
        eprintln!("= #{} {}", group.seq, group.title);
    }
}

fn build_filter(cli: &Cli) -> Result<FilterConfig, DiscoveryError> {
    let mut filter = FilterConfig::default()
        .with_time_option(cli.time_option)
        .with_min_rating(cli.min_rating)?
        .unread_only(cli.unread_only)
        .suppress_self_references(cli.suppress_self)
        .suppress_single_source(cli.suppress_single_source);

    if let Some(keywords) = cli.ignore.as_deref() {
        filter = filter.with_ignore_keywords(keywords)?;
    }
    if let Some(guide) = cli.guide.as_deref() {
        filter = filter.with_target_guide(guide);
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.pretty {
        telemetry::init_tracing_pretty();
    } else {
        telemetry::init_tracing();
    }

    let config = match cli.config.as_deref() {
        Some(path) => DiscoveryConfig::load(path).map_err(DiscoveryError::from)?,
        None => DiscoveryConfig::default(),
    };
    let corpus = InMemoryCorpus::load(&cli.corpus).map_err(DiscoveryError::from)?;
    let filter = build_filter(&cli)?;

    let fetcher: Arc<dyn PageFetcher> = if cli.offline {
        Arc::new(OfflineFetcher)
    } else {
        Arc::new(HttpFetcher::new(&config.resolver).map_err(DiscoveryError::from)?)
    };

    tracing::info!(
        corpus = %cli.corpus.display(),
        articles = corpus.article_count(),
        offline = cli.offline,
        "Hot link discovery starting"
    );

    let session = HotLinkSession::new(config, ResolverRules::new(), fetcher, ConsoleNotifier)
        .with_filter(filter);

    let progress = Arc::new(|percent: u8| tracing::debug!(percent, "Scan progress"));
    let stats = session.scan(Arc::new(corpus), progress).await?;
    tracing::info!(?stats, "Scan finished");

    let deadline = Instant::now() + Duration::from_secs(cli.wait_secs);
    while Instant::now() < deadline && session.visible().iter().any(|g| !g.resolved) {
        sleep(Duration::from_millis(100)).await;
    }

    let visible = session.visible();
    session.shutdown().await;

    for (rank, group) in visible.iter().enumerate() {
        println!(
            "{:>3}. [{}/{} refs, avg {:.1}] {}\n     {}",
            rank + 1,
            group.shown_references,
            group.reference_count,
            group.average_rating,
            group.title,
            group.url
        );
    }

    if cli.metrics {
        print!("{}", telemetry::get_metrics_string());
    }

    Ok(())
}
