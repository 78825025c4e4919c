//! Item reconciliation between in-memory feeds and storage.
//!
//! Externalize writes a feed's items keyed by GUID without reverting the
//! read or deleted state a user already gave them; internalize rebuilds a
//! feed from what is stored.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use super::connection::FeedCache;
use crate::Error;
use crate::model::{Feed, IgnoreRules, Item};

/// Column list shared by every query that rebuilds an `Item`.
macro_rules! item_columns {
    () => {
        "guid, title, link, author, description, pubdate, feedurl, unread, deleted, auto_enqueued, \
         flags, enclosure_url, enclosure_type, base"
    };
}

pub(crate) use item_columns;

const UPSERT_FEED: &str = "INSERT INTO feeds (url, title, link) VALUES (?1, ?2, ?3)
    ON CONFLICT(url) DO UPDATE SET
        title = excluded.title,
        link = excluded.link";

/// Insert-or-update keyed by GUID. `?15` selects whether the incoming
/// unread value overwrites the stored one.
const UPSERT_ITEM: &str = "INSERT INTO items (
        guid, feedurl, title, link, author, description, pubdate,
        unread, deleted, auto_enqueued, flags, enclosure_url, enclosure_type, base
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    ON CONFLICT(guid) DO UPDATE SET
        feedurl = excluded.feedurl,
        title = excluded.title,
        link = excluded.link,
        author = excluded.author,
        description = excluded.description,
        enclosure_url = excluded.enclosure_url,
        enclosure_type = excluded.enclosure_type,
        base = excluded.base,
        unread = CASE WHEN ?15 THEN excluded.unread ELSE items.unread END";

/// Rebuild an item from a row selected with `item_columns!()`.
pub(crate) fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        guid: row.get(0)?,
        title: row.get(1)?,
        link: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        pub_date: DateTime::from_timestamp(row.get(5)?, 0).unwrap_or_default(),
        feed_url: row.get(6)?,
        unread: row.get(7)?,
        deleted: row.get(8)?,
        enqueued: row.get(9)?,
        flags: row.get(10)?,
        enclosure_url: row.get(11)?,
        enclosure_type: row.get(12)?,
        base: row.get(13)?,
    })
}

/// Cut `items` to `limit`, keeping flagged items from beyond the cut.
fn apply_item_limit(items: &mut Vec<Item>, limit: usize) {
    if items.len() <= limit {
        return;
    }
    let overflow = items.split_off(limit);
    items.extend(overflow.into_iter().filter(Item::is_flagged));
}

impl FeedCache {
    /// Persist a feed and its items.
    ///
    /// Items are upserted by GUID inside one transaction. Existing rows get
    /// fresh content but keep their `unread` value unless `reset_unread` is
    /// set; `deleted`, flags, the enqueued marker and the first-seen
    /// publication date are never overwritten here. Query feeds are skipped.
    /// With `max_items` configured only the leading items are written, and
    /// with `keep_articles_days` configured items older than the horizon are
    /// not written, so a refetch cannot revive what retention removed.
    pub fn externalize_feed(&self, feed: &Feed, reset_unread: bool) -> Result<(), Error> {
        if feed.is_query_feed() {
            debug!(url = %feed.url, "Skipping externalize of query feed");
            return Ok(());
        }

        let config = self.config()?;
        let limit = config.item_limit().unwrap_or(usize::MAX);
        let cutoff = config.retention().and_then(|horizon| Utc::now().checked_sub_signed(horizon));

        let written = self.with_tx(|tx| {
            tx.execute(UPSERT_FEED, params![&feed.url, &feed.title, &feed.link])?;

            let mut stmt = tx.prepare_cached(UPSERT_ITEM)?;
            let mut written = 0usize;
            for item in feed.items.iter().take(limit) {
                if cutoff.is_some_and(|cutoff| item.pub_date.timestamp() < cutoff.timestamp()) {
                    continue;
                }
                stmt.execute(params![
                    &item.guid,
                    &feed.url,
                    &item.title,
                    &item.link,
                    &item.author,
                    &item.description,
                    item.pub_date.timestamp(),
                    item.unread,
                    item.deleted,
                    item.enqueued,
                    &item.flags,
                    &item.enclosure_url,
                    &item.enclosure_type,
                    &item.base,
                    reset_unread,
                ])?;
                written += 1;
            }
            Ok(written)
        })?;

        debug!(url = %feed.url, items = written, reset_unread, "Externalized feed");
        Ok(())
    }

    /// Rebuild a feed from storage.
    ///
    /// Soft-deleted items and items matched by `ignores` are left out;
    /// the rest come newest first. An unknown URL yields an empty feed.
    /// `ignores` runs after the connection lock is released.
    pub fn internalize_feed(&self, url: &str, ignores: &dyn IgnoreRules) -> Result<Feed, Error> {
        let limit = self.config()?.item_limit();

        let (meta, stored) = self.with_conn(|conn| {
            let meta = conn
                .query_row("SELECT title, link FROM feeds WHERE url = ?1", params![url], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .optional()?;

            let mut stmt = conn.prepare_cached(concat!(
                "SELECT ",
                item_columns!(),
                " FROM items WHERE feedurl = ?1 AND deleted = 0 ORDER BY pubdate DESC, rowid DESC"
            ))?;
            let items = stmt.query_map(params![url], item_from_row)?.collect::<Result<Vec<_>, _>>()?;
            Ok((meta, items))
        })?;

        let mut feed = Feed::new(url);
        if let Some((title, link)) = meta {
            feed.title = title;
            feed.link = link;
        }

        let stored_count = stored.len();
        feed.items = stored.into_iter().filter(|item| !ignores.matches(item)).collect();
        if let Some(limit) = limit {
            apply_item_limit(&mut feed.items, limit);
        }

        debug!(url, stored = stored_count, loaded = feed.items.len(), "Internalized feed");
        Ok(feed)
    }

    /// Persist an item's `unread` and `enqueued` values.
    pub fn update_item_unread_and_enqueued(&self, item: &Item) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE items SET unread = ?1, auto_enqueued = ?2 WHERE guid = ?3",
                params![item.unread, item.enqueued, &item.guid],
            )?;
            Ok(())
        })
    }

    /// Persist an item's flag string.
    pub fn update_item_flags(&self, item: &Item) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute("UPDATE items SET flags = ?1 WHERE guid = ?2", params![&item.flags, &item.guid])?;
            Ok(())
        })
    }

    /// Reload every item description of `feed` from storage.
    ///
    /// Items without a stored row keep their in-memory description.
    pub fn fetch_descriptions(&self, feed: &mut Feed) -> Result<(), Error> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT description FROM items WHERE guid = ?1")?;
            for item in &mut feed.items {
                if let Some(description) = stmt.query_row(params![&item.guid], |row| row.get(0)).optional()? {
                    item.description = description;
                }
            }
            Ok(())
        })
    }

    /// URLs of every stored feed.
    pub fn get_feed_urls(&self) -> Result<Vec<String>, Error> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT url FROM feeds ORDER BY url")?;
            let urls = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<_>, _>>()?;
            Ok(urls)
        })
    }

    /// Number of stored items of one feed, soft-deleted ones included.
    pub fn count_items(&self, feed_url: &str) -> Result<usize, Error> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM items WHERE feedurl = ?1", params![feed_url], |row| row.get(0))?)
        })
    }

    /// Number of stored unread items across all feeds.
    pub fn get_unread_count(&self) -> Result<usize, Error> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM items WHERE unread = 1", [], |row| row.get(0))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::model::NoIgnores;
    use chrono::{TimeZone, Utc};

    const URL: &str = "https://example.com/rss";

    fn make_test_feed(url: &str, count: usize) -> Feed {
        let mut feed = Feed::new(url);
        feed.title = "Example".into();
        feed.link = "https://example.com/".into();
        for i in 0..count {
            let mut item = Item::new(format!("{url}#{i}"));
            item.title = format!("Item {i}");
            item.description = format!("Body of item {i}");
            item.pub_date = Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 12, 0, 0).unwrap();
            feed.add_item(item);
        }
        feed
    }

    fn open() -> FeedCache {
        FeedCache::open_in_memory(CacheConfig::default()).unwrap()
    }

    #[test]
    fn test_externalize_and_internalize() {
        let db = open();
        let feed = make_test_feed(URL, 3);
        db.externalize_feed(&feed, false).unwrap();

        let loaded = db.internalize_feed(URL, &NoIgnores).unwrap();
        assert_eq!(loaded.title, "Example");
        assert_eq!(loaded.link, "https://example.com/");
        assert_eq!(loaded.items.len(), 3);
        // newest first
        assert_eq!(loaded.items[0].guid, format!("{URL}#2"));
        assert_eq!(loaded.items[2].guid, format!("{URL}#0"));
        assert_eq!(loaded.items[0].pub_date, feed.items[2].pub_date);
    }

    #[test]
    fn test_internalize_unknown_url_is_empty() {
        let db = open();
        let feed = db.internalize_feed("https://nowhere.example/rss", &NoIgnores).unwrap();
        assert!(feed.items.is_empty());
        assert_eq!(feed.url, "https://nowhere.example/rss");
    }

    #[test]
    fn test_reexternalize_updates_in_place_and_keeps_read_state() {
        let db = open();
        let mut feed = make_test_feed(URL, 2);
        db.externalize_feed(&feed, false).unwrap();
        db.mark_items_read_by_guid(&[&feed.items[0].guid]).unwrap();

        feed.items[0].title = "Edited".into();
        feed.items[0].unread = true;
        db.externalize_feed(&feed, false).unwrap();

        let loaded = db.internalize_feed(URL, &NoIgnores).unwrap();
        assert_eq!(loaded.items.len(), 2);
        let edited = loaded.items.iter().find(|i| i.guid == feed.items[0].guid).unwrap();
        assert_eq!(edited.title, "Edited");
        assert!(!edited.unread);
    }

    #[test]
    fn test_reset_unread_overwrites_stored_state() {
        let db = open();
        let feed = make_test_feed(URL, 1);
        db.externalize_feed(&feed, false).unwrap();
        db.catchup_all().unwrap();

        db.externalize_feed(&feed, true).unwrap();
        let loaded = db.internalize_feed(URL, &NoIgnores).unwrap();
        assert!(loaded.items[0].unread);
    }

    #[test]
    fn test_reexternalize_keeps_deleted_marker() {
        let db = open();
        let feed = make_test_feed(URL, 2);
        db.externalize_feed(&feed, false).unwrap();
        db.mark_item_deleted(URL, &feed.items[1].guid, true).unwrap();

        db.externalize_feed(&feed, true).unwrap();
        let loaded = db.internalize_feed(URL, &NoIgnores).unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].guid, feed.items[0].guid);
    }

    #[test]
    fn test_guid_moves_between_feeds_without_duplicating() {
        let db = open();
        let mut first = Feed::new("https://a.example/rss");
        first.add_item(Item::new("shared-guid"));
        db.externalize_feed(&first, false).unwrap();

        let mut second = Feed::new("https://b.example/rss");
        second.add_item(Item::new("shared-guid"));
        db.externalize_feed(&second, false).unwrap();

        assert!(db.internalize_feed("https://a.example/rss", &NoIgnores).unwrap().items.is_empty());
        assert_eq!(db.internalize_feed("https://b.example/rss", &NoIgnores).unwrap().items.len(), 1);
        assert_eq!(db.get_unread_count().unwrap(), 1);
    }

    #[test]
    fn test_ignore_rules_hide_but_keep_items() {
        let db = open();
        db.externalize_feed(&make_test_feed(URL, 3), false).unwrap();

        let hide_first = |item: &Item| item.title == "Item 1";
        let loaded = db.internalize_feed(URL, &hide_first).unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert!(loaded.items.iter().all(|i| i.title != "Item 1"));

        assert_eq!(db.internalize_feed(URL, &NoIgnores).unwrap().items.len(), 3);
    }

    #[test]
    fn test_query_feed_not_persisted() {
        let db = open();
        let feed = make_test_feed("query:unread", 2);
        db.externalize_feed(&feed, false).unwrap();
        assert!(db.get_feed_urls().unwrap().is_empty());
        assert_eq!(db.get_unread_count().unwrap(), 0);
    }

    #[test]
    fn test_failed_externalize_writes_nothing() {
        let db = open();
        let mut feed = make_test_feed(URL, 3);
        feed.items[1].guid = "rejected".into();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_item BEFORE INSERT ON items WHEN NEW.guid = 'rejected'
                BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(db.externalize_feed(&feed, false), Err(Error::Database(_))));
        assert_eq!(db.count_items(URL).unwrap(), 0);
        assert!(db.get_feed_urls().unwrap().is_empty());
    }

    #[test]
    fn test_max_items_limits_externalize() {
        let db = open();
        db.set_config(CacheConfig { max_items: 2, ..Default::default() }).unwrap();
        db.externalize_feed(&make_test_feed(URL, 5), false).unwrap();
        assert_eq!(db.get_unread_count().unwrap(), 2);
    }

    #[test]
    fn test_max_items_keeps_flagged_items_on_internalize() {
        let db = open();
        let mut feed = make_test_feed(URL, 4);
        feed.items[0].flags = "s".into();
        db.externalize_feed(&feed, false).unwrap();

        db.set_config(CacheConfig { max_items: 2, ..Default::default() }).unwrap();
        let loaded = db.internalize_feed(URL, &NoIgnores).unwrap();

        let guids: Vec<_> = loaded.items.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec![feed.items[3].guid.as_str(), feed.items[2].guid.as_str(), feed.items[0].guid.as_str()]);
    }

    #[test]
    fn test_update_unread_enqueued_and_flags() {
        let db = open();
        let feed = make_test_feed(URL, 1);
        db.externalize_feed(&feed, false).unwrap();

        let mut item = feed.items[0].clone();
        item.unread = false;
        item.enqueued = true;
        item.flags = "ab".into();
        db.update_item_unread_and_enqueued(&item).unwrap();
        db.update_item_flags(&item).unwrap();

        let loaded = &db.internalize_feed(URL, &NoIgnores).unwrap().items[0];
        assert!(!loaded.unread);
        assert!(loaded.enqueued);
        assert_eq!(loaded.flags, "ab");
    }

    #[test]
    fn test_fetch_descriptions() {
        let db = open();
        let feed = make_test_feed(URL, 2);
        db.externalize_feed(&feed, false).unwrap();

        let mut stale = feed.clone();
        for item in &mut stale.items {
            item.description.clear();
        }
        stale.add_item(Item::new("not-stored"));
        stale.items[2].description = "keep me".into();

        db.fetch_descriptions(&mut stale).unwrap();
        assert_eq!(stale.items[0].description, "Body of item 0");
        assert_eq!(stale.items[1].description, "Body of item 1");
        assert_eq!(stale.items[2].description, "keep me");
    }

    #[test]
    fn test_feed_urls_and_unread_count() {
        let db = open();
        db.externalize_feed(&make_test_feed("https://b.example/rss", 2), false).unwrap();
        db.externalize_feed(&make_test_feed("https://a.example/rss", 3), false).unwrap();

        assert_eq!(db.get_feed_urls().unwrap(), vec!["https://a.example/rss", "https://b.example/rss"]);
        assert_eq!(db.get_unread_count().unwrap(), 5);
    }

    #[test]
    fn test_apply_item_limit() {
        let mut items: Vec<Item> = (0..5).map(|i| Item::new(i.to_string())).collect();
        items[4].flags = "x".into();
        apply_item_limit(&mut items, 2);
        let guids: Vec<_> = items.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec!["0", "1", "4"]);
    }
}
