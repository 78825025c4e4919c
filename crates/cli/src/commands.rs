//! Command implementations. Each returns pretty-printed JSON.

use anyhow::Result;
use feedcache_core::{FeedCache, Item, ReplayAction};
use serde::Serialize;

/// Output of `stats`.
#[derive(Debug, Serialize)]
pub struct StatsOutput {
    pub schema_version: u32,
    pub unread_count: usize,
    pub feed_urls: Vec<String>,
}

/// Output of commands reporting how many rows they changed.
#[derive(Debug, Serialize)]
pub struct CountOutput {
    pub changed: usize,
}

/// Search hit without the description body.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub guid: String,
    pub feed_url: String,
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub unread: bool,
}

impl From<Item> for SearchHit {
    fn from(item: Item) -> Self {
        Self {
            guid: item.guid,
            feed_url: item.feed_url,
            title: item.title,
            link: item.link,
            pub_date: item.pub_date.to_rfc3339(),
            unread: item.unread,
        }
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn stats(cache: &FeedCache) -> Result<String> {
    let output = StatsOutput {
        schema_version: cache.schema_version()?,
        unread_count: cache.get_unread_count()?,
        feed_urls: cache.get_feed_urls()?,
    };
    render(&output)
}

pub fn search(cache: &FeedCache, query: &str, feed: Option<&str>) -> Result<String> {
    let hits: Vec<SearchHit> = cache.search_for_items(query, feed)?.into_iter().map(SearchHit::from).collect();
    render(&hits)
}

pub fn catchup(cache: &FeedCache, feed: Option<&str>) -> Result<String> {
    let changed = match feed {
        Some(url) => cache.catchup_feed_url(url)?,
        None => cache.catchup_all()?,
    };
    render(&CountOutput { changed })
}

pub fn read_guids(cache: &FeedCache) -> Result<String> {
    render(&cache.get_read_item_guids()?)
}

pub fn mark_read(cache: &FeedCache, guids: &[String]) -> Result<String> {
    render(&CountOutput { changed: cache.mark_items_read_by_guid(guids)? })
}

pub fn clean_old(cache: &FeedCache) -> Result<String> {
    render(&CountOutput { changed: cache.clean_old_articles()? })
}

pub fn vacuum(cache: &FeedCache) -> Result<String> {
    cache.do_vacuum()?;
    render(&serde_json::json!({ "vacuumed": true }))
}

pub fn lastmodified(cache: &FeedCache, uri: &str) -> Result<String> {
    render(&cache.fetch_lastmodified(uri)?)
}

pub fn replay_list(cache: &FeedCache) -> Result<String> {
    render(&cache.get_replay()?)
}

pub fn replay_record(cache: &FeedCache, guid: &str, action: ReplayAction) -> Result<String> {
    cache.record_replay(guid, action)?;
    render(&cache.get_replay()?)
}

pub fn replay_clear(cache: &FeedCache, guids: &[String]) -> Result<String> {
    render(&CountOutput { changed: cache.delete_replay_by_guid(guids)? })
}
