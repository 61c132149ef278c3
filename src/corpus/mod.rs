// * Article corpus consumed by the discovery engine
// * Feeds and articles are owned by the reader's domain; the engine only reads them

pub mod links;

pub use links::extract_links;

use crate::config::constants::RATING_UNRATED;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a guide (a user-defined group of feeds).
pub type GuideId = String;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read corpus file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed corpus document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A subscribed feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    /// Home page of the feed, used as the base URL for articles without a link
    #[serde(default)]
    pub site_url: Option<String>,
    /// User rating, `-1` when unrated
    #[serde(default = "unrated")]
    pub rating: i32,
    #[serde(default)]
    pub guides: Vec<GuideId>,
    /// Only feeds that keep their article history are scanned
    #[serde(default = "stores_history_default")]
    pub stores_history: bool,
}

fn unrated() -> i32 {
    RATING_UNRATED
}

fn stores_history_default() -> bool {
    true
}

impl Feed {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            site_url: None,
            rating: RATING_UNRATED,
            guides: Vec::new(),
            stores_history: true,
        }
    }

    pub fn with_site_url(mut self, url: &str) -> Self {
        self.site_url = Some(url.to_string());
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }

    pub fn in_guide(mut self, guide: &str) -> Self {
        self.guides.push(guide.to_string());
        self
    }

    pub fn without_history(mut self) -> Self {
        self.stores_history = false;
        self
    }

    pub fn is_rated(&self) -> bool {
        self.rating != RATING_UNRATED
    }

    pub fn belongs_to(&self, guide: &str) -> bool {
        self.guides.iter().any(|g| g == guide)
    }
}

/// A single article of a feed.
#[derive(Debug, Clone)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub feed: Arc<Feed>,
    /// Canonical link of the article itself
    pub link: Option<String>,
    pub published: DateTime<Utc>,
    pub read: bool,
    /// Outbound links as published; empty when they must be taken from `text`
    pub links: Vec<String>,
    pub text: Option<String>,
}

impl Article {
    pub fn new(feed: &Arc<Feed>, title: &str, published: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            feed: Arc::clone(feed),
            link: None,
            published,
            read: false,
            links: Vec::new(),
            text: None,
        }
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_text(mut self, html: &str) -> Self {
        self.text = Some(html.to_string());
        self
    }

    pub fn mark_read(mut self) -> Self {
        self.read = true;
        self
    }

    /// Links this article points at, in publication order.
    pub fn outbound_links(&self) -> Vec<String> {
        if !self.links.is_empty() {
            return self.links.clone();
        }
        self.text.as_deref().map(extract_links).unwrap_or_default()
    }

    /// URL that relative outbound links resolve against.
    pub fn base_url(&self) -> Option<&str> {
        self.link.as_deref().or(self.feed.site_url.as_deref())
    }
}

/// Read-only view over the reader's feeds.
pub trait Corpus: Send + Sync {
    fn feeds(&self) -> Vec<Arc<Feed>>;

    fn articles(&self, feed: &Feed) -> Vec<Arc<Article>>;
}

/// Corpus held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    feeds: Vec<(Arc<Feed>, Vec<Arc<Article>>)>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&mut self, feed: Feed) -> Arc<Feed> {
        let feed = Arc::new(feed);
        self.feeds.push((Arc::clone(&feed), Vec::new()));
        feed
    }

    /// Adds an article to its owning feed, registering the feed if unknown.
    pub fn add_article(&mut self, article: Article) -> Arc<Article> {
        let article = Arc::new(article);
        match self.feeds.iter_mut().find(|(f, _)| f.id == article.feed.id) {
            Some((_, articles)) => articles.push(Arc::clone(&article)),
            None => self
                .feeds
                .push((Arc::clone(&article.feed), vec![Arc::clone(&article)])),
        }
        article
    }

    pub fn article_count(&self) -> usize {
        self.feeds.iter().map(|(_, a)| a.len()).sum()
    }

    /// Parses a corpus document (see [`CorpusDocument`]).
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let doc: CorpusDocument = serde_json::from_str(json)?;
        Ok(doc.into())
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Corpus for InMemoryCorpus {
    fn feeds(&self) -> Vec<Arc<Feed>> {
        self.feeds.iter().map(|(f, _)| Arc::clone(f)).collect()
    }

    fn articles(&self, feed: &Feed) -> Vec<Arc<Article>> {
        self.feeds
            .iter()
            .find(|(f, _)| f.id == feed.id)
            .map(|(_, articles)| articles.clone())
            .unwrap_or_default()
    }
}

/// On-disk shape of a corpus: feeds with their articles nested.
#[derive(Debug, Deserialize)]
pub struct CorpusDocument {
    pub feeds: Vec<FeedDocument>,
}

#[derive(Debug, Deserialize)]
pub struct FeedDocument {
    #[serde(flatten)]
    pub feed: Feed,
    #[serde(default)]
    pub articles: Vec<ArticleDocument>,
}

#[derive(Debug, Deserialize)]
pub struct ArticleDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl From<CorpusDocument> for InMemoryCorpus {
    fn from(doc: CorpusDocument) -> Self {
        let mut corpus = InMemoryCorpus::new();
        for record in doc.feeds {
            let feed = corpus.add_feed(record.feed);
            for a in record.articles {
                corpus.add_article(Article {
                    id: a.id,
                    title: a.title,
                    feed: Arc::clone(&feed),
                    link: a.link,
                    published: a.published,
                    read: a.read,
                    links: a.links,
                    text: a.text,
                });
            }
        }
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_links_prefer_explicit_list() {
        let feed = Arc::new(Feed::new("f"));
        let article = Article::new(&feed, "a", Utc::now())
            .with_links(["http://a.test/1"])
            .with_text(r#"<a href="http://b.test/2">b</a>"#);
        assert_eq!(article.outbound_links(), vec!["http://a.test/1"]);
    }

    #[test]
    fn test_outbound_links_from_text() {
        let feed = Arc::new(Feed::new("f"));
        let article = Article::new(&feed, "a", Utc::now()).with_text(r#"<a href="/rel">r</a>"#);
        assert_eq!(article.outbound_links(), vec!["/rel"]);
    }

    #[test]
    fn test_base_url_falls_back_to_site() {
        let feed = Arc::new(Feed::new("f").with_site_url("http://site.test/"));
        let article = Article::new(&feed, "a", Utc::now());
        assert_eq!(article.base_url(), Some("http://site.test/"));

        let linked = article.with_link("http://site.test/post/1");
        assert_eq!(linked.base_url(), Some("http://site.test/post/1"));
    }

    #[test]
    fn test_corpus_from_json() {
        let json = r#"{
            "feeds": [
                {
                    "title": "One",
                    "rating": 4,
                    "guides": ["tech"],
                    "articles": [
                        { "title": "a1", "published": "2024-01-15T10:00:00Z", "links": ["http://x.test/a"] }
                    ]
                },
                { "title": "Two", "articles": [] }
            ]
        }"#;
        let corpus = InMemoryCorpus::from_json(json).unwrap();
        let feeds = corpus.feeds();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].rating, 4);
        assert!(feeds[0].belongs_to("tech"));
        assert!(!feeds[1].is_rated());
        assert!(feeds[1].stores_history);

        let articles = corpus.articles(&feeds[0]);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].feed.id, feeds[0].id);
        assert_eq!(corpus.article_count(), 1);
    }

    #[test]
    fn test_add_article_registers_unknown_feed() {
        let mut corpus = InMemoryCorpus::new();
        let feed = Arc::new(Feed::new("loose"));
        corpus.add_article(Article::new(&feed, "a", Utc::now()));
        assert_eq!(corpus.feeds().len(), 1);
        assert_eq!(corpus.articles(&feed).len(), 1);
    }
}
