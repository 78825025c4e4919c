//! In-memory feed and item graph exchanged with the cache.
//!
//! These are plain values: the parser builds them, the cache persists and
//! rebuilds them. Nothing here talks to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URL prefix of virtual feeds assembled from a filter expression.
pub const QUERY_FEED_PREFIX: &str = "query:";

/// A single feed entry.
///
/// `guid` is the identity contract: it is unique across every feed, not
/// just within `feed_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub author: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub feed_url: String,
    pub unread: bool,
    pub deleted: bool,
    /// Set once the enclosure was handed to the download queue.
    pub enqueued: bool,
    pub flags: String,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    pub base: String,
}

impl Item {
    /// Create an unread item with the given GUID and empty content.
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into(), unread: true, ..Default::default() }
    }

    /// Whether the item carries user flags.
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// A feed with its ordered items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Source URI; the feed's identity.
    pub url: String,
    pub title: String,
    pub link: String,
    pub items: Vec<Item>,
}

impl Feed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    /// Virtual feeds are computed from other feeds and never persisted.
    pub fn is_query_feed(&self) -> bool {
        self.url.starts_with(QUERY_FEED_PREFIX)
    }

    /// Append an item, stamping it with this feed's URL.
    pub fn add_item(&mut self, mut item: Item) {
        item.feed_url.clone_from(&self.url);
        self.items.push(item);
    }
}

/// Predicate deciding which stored items stay hidden when a feed is rebuilt.
pub trait IgnoreRules {
    fn matches(&self, item: &Item) -> bool;
}

/// Hides nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIgnores;

impl IgnoreRules for NoIgnores {
    fn matches(&self, _item: &Item) -> bool {
        false
    }
}

impl<F> IgnoreRules for F
where
    F: Fn(&Item) -> bool,
{
    fn matches(&self, item: &Item) -> bool {
        self(item)
    }
}
