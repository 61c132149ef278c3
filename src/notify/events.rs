// * Consumer-facing result events and the callback interface they are delivered through

use crate::corpus::Article;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Point-in-time view of a result group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub seq: u64,
    pub url: String,
    /// Resolved title, or the URL while unresolved
    pub title: String,
    pub resolved: bool,
    /// Contributors across the whole scan; the ranking key
    pub reference_count: usize,
    /// Contributors that passed the current filter, one per `ItemAdded`
    pub shown_references: usize,
    pub average_rating: f64,
}

/// A contributing article as shown under its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub article_id: Uuid,
    pub title: String,
    pub feed_title: String,
    pub link: Option<String>,
    pub published: DateTime<Utc>,
    pub read: bool,
}

impl From<&Article> for ItemSnapshot {
    fn from(article: &Article) -> Self {
        Self {
            article_id: article.id,
            title: article.title.clone(),
            feed_title: article.feed.title.clone(),
            link: article.link.clone(),
            published: article.published,
            read: article.read,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent {
    Cleared,
    GroupAdded(GroupSnapshot),
    ItemAdded { group_seq: u64, item: ItemSnapshot },
    GroupUpdated(GroupSnapshot),
}

/// Implemented by the consumer of discovery results.
///
/// Every call is made from a single dispatcher task, never from a resolver worker,
/// so implementations need no synchronization of their own.
pub trait ResultNotifier: Send + 'static {
    /// The visible set is about to be rebuilt from scratch.
    fn clear(&mut self);

    fn group_added(&mut self, group: GroupSnapshot);

    fn item_added(&mut self, group_seq: u64, item: ItemSnapshot);

    /// A group's title was resolved.
    fn group_updated(&mut self, group: GroupSnapshot);
}

impl ResultEvent {
    // * Routes the event to the matching callback
    pub fn deliver<N: ResultNotifier + ?Sized>(self, notifier: &mut N) {
        match self {
            ResultEvent::Cleared => notifier.clear(),
            ResultEvent::GroupAdded(group) => notifier.group_added(group),
            ResultEvent::ItemAdded { group_seq, item } => notifier.item_added(group_seq, item),
            ResultEvent::GroupUpdated(group) => notifier.group_updated(group),
        }
    }
}

/// Notifier that records every event, in delivery order.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<ResultEvent>,
}

impl ResultNotifier for EventLog {
    fn clear(&mut self) {
        self.events.push(ResultEvent::Cleared);
    }

    fn group_added(&mut self, group: GroupSnapshot) {
        self.events.push(ResultEvent::GroupAdded(group));
    }

    fn item_added(&mut self, group_seq: u64, item: ItemSnapshot) {
        self.events.push(ResultEvent::ItemAdded { group_seq, item });
    }

    fn group_updated(&mut self, group: GroupSnapshot) {
        self.events.push(ResultEvent::GroupUpdated(group));
    }
}
