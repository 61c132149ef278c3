use chrono::{Duration, Utc};
use hotlinks::config::AggregationConfig;
use hotlinks::corpus::{Article, Feed, InMemoryCorpus};
use hotlinks::engine::Aggregator;
use parking_lot::Mutex;
use std::sync::Arc;

// * Test Suite for the Aggregation Engine and Ranking

fn no_progress(_: u8) {}

#[test]
fn test_two_feeds_form_one_cluster() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    let one = corpus.add_feed(Feed::new("one"));
    let two = corpus.add_feed(Feed::new("two"));
    corpus.add_article(Article::new(&one, "p1", now - Duration::hours(2)).with_links(["http://x.test/a"]));
    corpus.add_article(Article::new(&two, "p2", now - Duration::hours(3)).with_links(["http://x.test/a/"]));

    let (clusters, stats) = Aggregator::default().scan(&corpus, now, &no_progress);

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].url(), "http://x.test/a");
    assert_eq!(clusters[0].reference_count(), 2);
    assert_eq!(stats.feeds_scanned, 2);
    assert_eq!(stats.articles_scanned, 2);
}

#[test]
fn test_article_counted_once_per_cluster() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    let one = corpus.add_feed(Feed::new("one").with_rating(4));
    let two = corpus.add_feed(Feed::new("two").with_rating(2));
    corpus.add_article(
        Article::new(&one, "p1", now)
            .with_links(["http://x.test/a", "HTTP://x.test/a/", "http://x.test/a"]),
    );
    corpus.add_article(Article::new(&two, "p2", now).with_links(["http://x.test/a"]));

    let (clusters, _) = Aggregator::default().scan(&corpus, now, &no_progress);

    assert_eq!(clusters.len(), 1);
    let link = &clusters[0];
    assert_eq!(link.reference_count(), 2);
    assert_eq!(link.cumulative_rating(), 6);
    assert_eq!(link.ratings_count(), 2);
}

#[test]
fn test_below_minimum_references_dropped() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    let one = corpus.add_feed(Feed::new("one"));
    corpus.add_article(Article::new(&one, "p1", now).with_links(["http://x.test/lonely"]));

    let (clusters, stats) = Aggregator::default().scan(&corpus, now, &no_progress);
    assert!(clusters.is_empty());
    assert_eq!(stats.clusters_found, 1);
    assert_eq!(stats.clusters_kept, 0);

    let permissive = Aggregator::new(AggregationConfig {
        min_references: 1,
        ..AggregationConfig::default()
    });
    let (clusters, _) = permissive.scan(&corpus, now, &no_progress);
    assert_eq!(clusters.len(), 1);
}

#[test]
fn test_recency_window_and_history_flag() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    let fresh = corpus.add_feed(Feed::new("fresh"));
    let stale = corpus.add_feed(Feed::new("stale"));
    let transient = corpus.add_feed(Feed::new("transient").without_history());

    corpus.add_article(Article::new(&fresh, "new", now - Duration::days(1)).with_links(["http://x.test/a"]));
    corpus.add_article(Article::new(&stale, "old", now - Duration::days(8)).with_links(["http://x.test/a"]));
    corpus.add_article(Article::new(&transient, "t", now).with_links(["http://x.test/a"]));

    let (clusters, stats) = Aggregator::default().scan(&corpus, now, &no_progress);
    assert!(clusters.is_empty());
    assert_eq!(stats.feeds_scanned, 2);
    assert_eq!(stats.articles_scanned, 1);
}

#[test]
fn test_relative_links_resolve_against_article_or_site() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    let one = corpus.add_feed(Feed::new("one").with_site_url("http://x.test/"));
    let two = corpus.add_feed(Feed::new("two"));
    corpus.add_article(Article::new(&one, "p1", now).with_links(["/a"]));
    corpus.add_article(
        Article::new(&two, "p2", now)
            .with_link("http://x.test/blog/post")
            .with_text(r#"<p>see <a href="../a">this</a></p>"#),
    );

    let (clusters, _) = Aggregator::default().scan(&corpus, now, &no_progress);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].url(), "http://x.test/a");
}

#[test]
fn test_ranking_order() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    let high = corpus.add_feed(Feed::new("high").with_rating(5));
    let low = corpus.add_feed(Feed::new("low").with_rating(1));
    let third = corpus.add_feed(Feed::new("third"));

    corpus.add_article(
        Article::new(&high, "h", now).with_links(["http://b.test/rated", "http://c.test/three"]),
    );
    corpus.add_article(
        Article::new(&low, "l", now).with_links([
            "http://b.test/rated",
            "http://a.test/low",
            "http://c.test/three",
        ]),
    );
    corpus.add_article(
        Article::new(&third, "t", now).with_links(["http://a.test/low", "http://c.test/three"]),
    );

    let (clusters, _) = Aggregator::default().scan(&corpus, now, &no_progress);
    let urls: Vec<&str> = clusters.iter().map(|c| c.url()).collect();

    // * three refs first; then average 3.0 beats average 1.0
    assert_eq!(urls, vec!["http://c.test/three", "http://b.test/rated", "http://a.test/low"]);
}

#[test]
fn test_progress_reported_per_feed() {
    let now = Utc::now();
    let mut corpus = InMemoryCorpus::new();
    for name in ["a", "b", "c", "d"] {
        corpus.add_feed(Feed::new(name));
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = move |p: u8| sink.lock().push(p);

    Aggregator::default().scan(&corpus, now, &progress);

    let seen = seen.lock().clone();
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_empty_corpus_completes_progress() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = move |p: u8| sink.lock().push(p);

    let (clusters, _) = Aggregator::default().scan(&InMemoryCorpus::new(), Utc::now(), &progress);
    assert!(clusters.is_empty());
    assert_eq!(seen.lock().last(), Some(&100));
}
