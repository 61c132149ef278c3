// * HotLink - aggregate record for one canonical URL and the articles citing it

use crate::corpus::Article;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// A link target referenced by one or more articles.
///
/// Contributors are kept in the order they were first seen and are never
/// counted twice. The rating bookkeeping only considers rated feeds, so
/// `average_rating` is `0.0` until at least one rated feed contributes.
#[derive(Debug)]
pub struct HotLink {
    url: String,
    articles: Vec<Arc<Article>>,
    seen: HashSet<Uuid>,
    cumulative_rating: i64,
    ratings_count: u32,
    title: RwLock<Option<String>>,
}

impl HotLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            articles: Vec::new(),
            seen: HashSet::new(),
            cumulative_rating: 0,
            ratings_count: 0,
            title: RwLock::new(None),
        }
    }

    /// Canonical URL of the target
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Registers a contributing article. Returns false if it was already known.
    pub fn add(&mut self, article: &Arc<Article>) -> bool {
        if !self.seen.insert(article.id) {
            return false;
        }

        if article.feed.is_rated() {
            self.cumulative_rating += i64::from(article.feed.rating);
            self.ratings_count += 1;
        }

        self.articles.push(Arc::clone(article));
        true
    }

    pub fn articles(&self) -> &[Arc<Article>] {
        &self.articles
    }

    pub fn contains(&self, article: &Article) -> bool {
        self.seen.contains(&article.id)
    }

    pub fn reference_count(&self) -> usize {
        self.articles.len()
    }

    pub fn cumulative_rating(&self) -> i64 {
        self.cumulative_rating
    }

    pub fn ratings_count(&self) -> u32 {
        self.ratings_count
    }

    pub fn average_rating(&self) -> f64 {
        if self.ratings_count == 0 {
            0.0
        } else {
            self.cumulative_rating as f64 / f64::from(self.ratings_count)
        }
    }

    /// Resolved title, if any
    pub fn title(&self) -> Option<String> {
        self.title.read().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.write() = Some(title.into());
    }

    /// Title when resolved, the URL otherwise
    pub fn display_name(&self) -> String {
        self.title().unwrap_or_else(|| self.url.clone())
    }
}
