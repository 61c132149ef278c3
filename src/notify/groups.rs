// * Result groups: clusters as presented to the consumer
// * ResultSet separates every known group from the visible, ordered subset

use crate::corpus::Article;
use crate::engine::HotLink;
use crate::notify::events::{GroupSnapshot, ItemSnapshot};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Resolution {
    Unresolved = 0,
    Resolving = 1,
    Resolved = 2,
}

impl Resolution {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Resolution::Resolving,
            2 => Resolution::Resolved,
            _ => Resolution::Unresolved,
        }
    }
}

/// A HotLink wrapped with presentation state.
#[derive(Debug)]
pub struct ResultGroup {
    seq: u64,
    link: Arc<HotLink>,
    visible: AtomicBool,
    resolution: AtomicU8,
    items: Mutex<Vec<Arc<Article>>>,
}

impl ResultGroup {
    pub fn new(seq: u64, link: Arc<HotLink>) -> Self {
        Self {
            seq,
            link,
            visible: AtomicBool::new(false),
            resolution: AtomicU8::new(Resolution::Unresolved as u8),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn link(&self) -> &Arc<HotLink> {
        &self.link
    }

    pub fn url(&self) -> &str {
        self.link.url()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_u8(self.resolution.load(Ordering::Acquire))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution() == Resolution::Resolved
    }

    /// Claims the group for a resolution task. False when one is already in flight.
    pub fn try_begin_resolving(&self) -> bool {
        let mut current = self.resolution.load(Ordering::Acquire);
        loop {
            if current == Resolution::Resolving as u8 {
                return false;
            }
            match self.resolution.compare_exchange(
                current,
                Resolution::Resolving as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn mark_resolved(&self) {
        self.resolution
            .store(Resolution::Resolved as u8, Ordering::Release);
    }

    // * Gives up an in-flight claim so a later visibility change can schedule again
    pub fn reset_resolution(&self) {
        let _ = self.resolution.compare_exchange(
            Resolution::Resolving as u8,
            Resolution::Unresolved as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Replaces the member articles currently shown
    pub fn set_items(&self, items: Vec<Arc<Article>>) {
        *self.items.lock() = items;
    }

    pub fn items(&self) -> Vec<Arc<Article>> {
        self.items.lock().clone()
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            seq: self.seq,
            url: self.link.url().to_string(),
            title: self.link.display_name(),
            resolved: self.is_resolved(),
            reference_count: self.link.reference_count(),
            shown_references: self.items.lock().len(),
            average_rating: self.link.average_rating(),
        }
    }

    pub fn item_snapshots(&self) -> Vec<ItemSnapshot> {
        self.items
            .lock()
            .iter()
            .map(|a| ItemSnapshot::from(a.as_ref()))
            .collect()
    }
}

/// Known groups keyed by canonical URL, plus the currently visible subset.
#[derive(Debug, Default)]
pub struct ResultSet {
    next_seq: AtomicU64,
    known: Mutex<HashMap<String, Arc<ResultGroup>>>,
    visible: RwLock<Vec<Arc<ResultGroup>>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing group for the link's URL, or a new one with the next sequence number.
    ///
    /// A group built for an older HotLink of the same URL (from a previous scan) is
    /// replaced, keeping its sequence number.
    pub fn group_for(&self, link: &Arc<HotLink>) -> Arc<ResultGroup> {
        let mut known = self.known.lock();

        if let Some(existing) = known.get(link.url()) {
            if Arc::ptr_eq(existing.link(), link) {
                return Arc::clone(existing);
            }
        }

        let seq = match known.get(link.url()) {
            Some(stale) => {
                stale.set_visible(false);
                stale.seq()
            }
            None => self.next_seq.fetch_add(1, Ordering::Relaxed) + 1,
        };

        let group = Arc::new(ResultGroup::new(seq, Arc::clone(link)));
        known.insert(link.url().to_string(), Arc::clone(&group));
        group
    }

    /// Makes exactly `groups` visible, in the given order.
    pub fn replace_visible(&self, groups: Vec<Arc<ResultGroup>>) {
        let mut visible = self.visible.write();
        for group in visible.iter() {
            group.set_visible(false);
        }
        for group in &groups {
            group.set_visible(true);
        }
        *visible = groups;
    }

    pub fn visible(&self) -> Vec<Arc<ResultGroup>> {
        self.visible.read().clone()
    }

    pub fn known_count(&self) -> usize {
        self.known.lock().len()
    }

    pub fn find(&self, url: &str) -> Option<Arc<ResultGroup>> {
        self.known.lock().get(url).cloned()
    }

    // * Drops groups whose URL is no longer among the clusters
    pub fn retain_urls(&self, links: &[Arc<HotLink>]) {
        let current: HashSet<&str> = links.iter().map(|l| l.url()).collect();
        let mut known = self.known.lock();
        known.retain(|url, group| {
            let keep = current.contains(url.as_str());
            if !keep {
                group.set_visible(false);
            }
            keep
        });
    }
}
