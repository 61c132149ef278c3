use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use hotlinks::config::ResolverConfig;
use hotlinks::engine::HotLink;
use hotlinks::network::{HttpFetcher, NetworkError, Page, PageFetcher};
use hotlinks::notify::{spawn_dispatcher, GroupSnapshot, ItemSnapshot, Resolution, ResultEvent, ResultGroup, ResultNotifier};
use hotlinks::resolver::{ResolverRules, TitleResolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// * Test Suite for Title Resolution

struct ChannelNotifier(mpsc::UnboundedSender<ResultEvent>);

impl ResultNotifier for ChannelNotifier {
    fn clear(&mut self) {
        let _ = self.0.send(ResultEvent::Cleared);
    }

    fn group_added(&mut self, group: GroupSnapshot) {
        let _ = self.0.send(ResultEvent::GroupAdded(group));
    }

    fn item_added(&mut self, group_seq: u64, item: ItemSnapshot) {
        let _ = self.0.send(ResultEvent::ItemAdded { group_seq, item });
    }

    fn group_updated(&mut self, group: GroupSnapshot) {
        let _ = self.0.send(ResultEvent::GroupUpdated(group));
    }
}

// * Serves a fixed HTML document and counts how often it was opened
struct SpyFetcher {
    calls: AtomicUsize,
    content_type: &'static str,
    document: String,
}

impl SpyFetcher {
    fn html(document: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            content_type: "text/html; charset=utf-8",
            document: document.to_string(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for SpyFetcher {
    async fn open(&self, _url: &str) -> Result<Page, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // * Small chunks so the scanner sees tag boundaries mid-chunk
        let chunks: Vec<Result<Vec<u8>, NetworkError>> = self
            .document
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(Page {
            content_type: Some(self.content_type.to_string()),
            body: stream::iter(chunks).boxed(),
        })
    }
}

// * Sends the head of a page, then never another byte
struct StallingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for StallingFetcher {
    async fn open(&self, _url: &str) -> Result<Page, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let head = stream::once(async { Ok::<_, NetworkError>(b"<html><head>".to_vec()) });
        Ok(Page {
            content_type: Some("text/html".to_string()),
            body: head.chain(stream::pending()).boxed(),
        })
    }
}

// * Holds the first request until released; every page has the same title
struct GatedFetcher {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for GatedFetcher {
    async fn open(&self, url: &str) -> Result<Page, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.ends_with("/gate") {
            self.gate.notified().await;
        }
        let chunks: Vec<Result<Vec<u8>, NetworkError>> = vec![Ok(b"<title>Gated</title>".to_vec())];
        Ok(Page {
            content_type: Some("text/html".to_string()),
            body: stream::iter(chunks).boxed(),
        })
    }
}

struct Harness {
    resolver: TitleResolver,
    updates: mpsc::UnboundedReceiver<ResultEvent>,
}

fn harness(config: ResolverConfig, rules: ResolverRules, fetcher: Arc<dyn PageFetcher>) -> Harness {
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let (notifier, _task) = spawn_dispatcher(ChannelNotifier(tx), token.clone());
    Harness {
        resolver: TitleResolver::new(config, rules, fetcher, notifier, token),
        updates: rx,
    }
}

fn visible_group(seq: u64, url: &str) -> Arc<ResultGroup> {
    let group = Arc::new(ResultGroup::new(seq, Arc::new(HotLink::new(url))));
    group.set_visible(true);
    group
}

async fn next_update(rx: &mut mpsc::UnboundedReceiver<ResultEvent>) -> GroupSnapshot {
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(ResultEvent::GroupUpdated(group)) => return group,
                Some(_) => continue,
                None => panic!("dispatcher closed"),
            }
        }
    })
    .await
    .expect("no group update within 5s")
}

async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_cache_round_trip_fetches_once() {
    let spy = SpyFetcher::html("<html><head><title>Spy Page</title></head></html>");
    let mut h = harness(ResolverConfig::default(), ResolverRules::new(), spy.clone());

    let first = visible_group(1, "http://x.test/a");
    assert_eq!(h.resolver.resolve(&first), "http://x.test/a");
    let update = next_update(&mut h.updates).await;
    assert_eq!(update.title, "Spy Page");
    assert!(update.resolved);

    // * Same URL again, for instance after a re-scan produced a new cluster
    let second = visible_group(2, "http://x.test/a");
    assert_eq!(h.resolver.resolve(&second), "Spy Page");
    assert!(second.is_resolved());
    assert_eq!(spy.calls(), 1);
}

#[tokio::test]
async fn test_resolves_title_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><TITLE>Mock &amp; Title</TITLE></head><body></body></html>",
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;

    let config = ResolverConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    let mut h = harness(config, ResolverRules::new(), fetcher);

    let url = format!("{}/page", server.uri());
    let group = visible_group(1, &url);
    h.resolver.resolve(&group);

    let update = next_update(&mut h.updates).await;
    assert_eq!(update.title, "Mock & Title");
    assert_eq!(h.resolver.cache().get(&url).as_deref(), Some("Mock & Title"));
}

#[tokio::test]
async fn test_latin1_title_decoded_by_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"<html><head><title>Caf\xe9 du Monde</title></head></html>".to_vec(),
            "text/html; charset=iso-8859-1",
        ))
        .mount(&server)
        .await;

    let config = ResolverConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    let mut h = harness(config, ResolverRules::new(), fetcher);

    let url = format!("{}/latin1", server.uri());
    h.resolver.resolve(&visible_group(1, &url));

    assert_eq!(next_update(&mut h.updates).await.title, "Caf\u{e9} du Monde");
}

#[tokio::test]
async fn test_non_html_content_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<title>Not scanned</title>", "application/pdf"))
        .mount(&server)
        .await;

    let config = ResolverConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    let mut h = harness(config, ResolverRules::new(), fetcher);

    let url = format!("{}/doc.pdf", server.uri());
    h.resolver.resolve(&visible_group(1, &url));

    let update = next_update(&mut h.updates).await;
    assert_eq!(update.title, format!("[Unresolved] {}", url));
}

#[tokio::test]
async fn test_http_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = ResolverConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    let mut h = harness(config, ResolverRules::new(), fetcher);

    let url = format!("{}/missing", server.uri());
    h.resolver.resolve(&visible_group(1, &url));

    let update = next_update(&mut h.updates).await;
    assert_eq!(update.title, format!("[Unresolved] {}", url));
}

#[tokio::test]
async fn test_scan_limit_override() {
    let document = format!("<html>{}<title>Deep Title</title>", " ".repeat(3000));

    let spy = SpyFetcher::html(&document);
    let mut h = harness(ResolverConfig::default(), ResolverRules::new(), spy);
    h.resolver.resolve(&visible_group(1, "http://bigheaders.test/a"));
    assert_eq!(
        next_update(&mut h.updates).await.title,
        "[Unresolved] http://bigheaders.test/a"
    );

    let mut rules = ResolverRules::new();
    rules.add_scan_limit(r"^https?://bigheaders\.test/", 8000).unwrap();
    let spy = SpyFetcher::html(&document);
    let mut h = harness(ResolverConfig::default(), rules, spy);
    h.resolver.resolve(&visible_group(1, "http://bigheaders.test/a"));
    assert_eq!(next_update(&mut h.updates).await.title, "Deep Title");
}

#[tokio::test]
async fn test_rewrite_rules_apply_after_unescape() {
    let mut rules = ResolverRules::new();
    rules
        .add_rewrite(r"^(?P<x>.+?): (?P<y>.+) on (?P<svc>Technorati)$", "$svc tag: $x ($y)")
        .unwrap();

    let spy = SpyFetcher::html("<title>rust: posts &amp; links on Technorati</title>");
    let mut h = harness(ResolverConfig::default(), rules, spy);
    h.resolver.resolve(&visible_group(1, "http://technorati.test/tag/rust"));

    assert_eq!(
        next_update(&mut h.updates).await.title,
        "Technorati tag: rust (posts & links)"
    );
}

#[tokio::test]
async fn test_custom_resolver_skips_fetch() {
    let mut rules = ResolverRules::new();
    rules
        .add_pattern_resolver(r"^https?://del\.icio\.us/tag/([^/?]+)", "del.icio.us tag: $1")
        .unwrap();

    let spy = SpyFetcher::html("<title>Fetched</title>");
    let mut h = harness(ResolverConfig::default(), rules, spy.clone());
    h.resolver.resolve(&visible_group(1, "http://del.icio.us/tag/rust"));

    assert_eq!(next_update(&mut h.updates).await.title, "del.icio.us tag: rust");
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_stop_aborts_in_flight_read() {
    let fetcher = Arc::new(StallingFetcher {
        calls: AtomicUsize::new(0),
    });
    let mut h = harness(ResolverConfig::default(), ResolverRules::new(), fetcher.clone());

    let group = visible_group(1, "http://slow.test/a");
    h.resolver.resolve(&group);
    wait_for(|| fetcher.calls.load(Ordering::SeqCst) == 1).await;

    h.resolver.stop();
    wait_for(|| group.resolution() == Resolution::Unresolved).await;

    sleep(Duration::from_millis(100)).await;
    assert!(h.updates.try_recv().is_err());
    assert!(!group.is_resolved());
}

#[tokio::test]
async fn test_queued_tasks_are_noops_after_stop() {
    let fetcher = Arc::new(StallingFetcher {
        calls: AtomicUsize::new(0),
    });
    let config = ResolverConfig {
        workers: 1,
        ..ResolverConfig::default()
    };
    let mut h = harness(config, ResolverRules::new(), fetcher.clone());

    let running = visible_group(1, "http://slow.test/a");
    h.resolver.resolve(&running);
    wait_for(|| fetcher.calls.load(Ordering::SeqCst) == 1).await;

    let queued = visible_group(2, "http://slow.test/b");
    h.resolver.resolve(&queued);
    assert_eq!(h.resolver.pending(), 1);

    h.resolver.stop();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(!queued.is_resolved());
    assert!(h.updates.try_recv().is_err());
}

#[tokio::test]
async fn test_full_queue_leaves_group_unresolved() {
    let fetcher = Arc::new(StallingFetcher {
        calls: AtomicUsize::new(0),
    });
    let config = ResolverConfig {
        workers: 1,
        queue_capacity: 1,
        ..ResolverConfig::default()
    };
    let h = harness(config, ResolverRules::new(), fetcher.clone());

    h.resolver.resolve(&visible_group(1, "http://slow.test/a"));
    wait_for(|| fetcher.calls.load(Ordering::SeqCst) == 1).await;

    let queued = visible_group(2, "http://slow.test/b");
    h.resolver.resolve(&queued);
    assert_eq!(queued.resolution(), Resolution::Resolving);

    let rejected = visible_group(3, "http://slow.test/c");
    assert_eq!(h.resolver.resolve(&rejected), "http://slow.test/c");
    assert_eq!(rejected.resolution(), Resolution::Unresolved);

    h.resolver.stop();
}

#[tokio::test]
async fn test_hidden_group_skipped_when_task_runs() {
    let fetcher = Arc::new(GatedFetcher {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let config = ResolverConfig {
        workers: 1,
        ..ResolverConfig::default()
    };
    let mut h = harness(config, ResolverRules::new(), fetcher.clone());

    // * The single worker is held on the gated page while the second group is hidden
    let gated = visible_group(1, "http://x.test/gate");
    h.resolver.resolve(&gated);
    wait_for(|| fetcher.calls.load(Ordering::SeqCst) == 1).await;

    let hidden = visible_group(2, "http://x.test/b");
    h.resolver.resolve(&hidden);
    hidden.set_visible(false);

    fetcher.gate.notify_one();
    assert_eq!(next_update(&mut h.updates).await.seq, 1);

    wait_for(|| hidden.resolution() == Resolution::Unresolved).await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}
