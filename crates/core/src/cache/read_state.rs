//! Read-state bookkeeping.
//!
//! Catch-up at three granularities, bulk mark-by-GUID, export of read GUIDs
//! and the soft-delete marker.

use std::collections::HashSet;

use rusqlite::params;
use tracing::debug;

use super::connection::FeedCache;
use crate::Error;
use crate::model::Feed;

impl FeedCache {
    /// Mark every stored item read.
    ///
    /// Returns the number of items that changed.
    pub fn catchup_all(&self) -> Result<usize, Error> {
        let changed = self.with_conn(|conn| Ok(conn.execute("UPDATE items SET unread = 0 WHERE unread = 1", [])?))?;
        debug!(changed, "Caught up all feeds");
        Ok(changed)
    }

    /// Mark read every item stored under `feed_url`.
    pub fn catchup_feed_url(&self, feed_url: &str) -> Result<usize, Error> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute("UPDATE items SET unread = 0 WHERE unread = 1 AND feedurl = ?1", params![feed_url])?)
        })?;
        debug!(feed_url, changed, "Caught up feed");
        Ok(changed)
    }

    /// Mark read exactly the items present in `feed`, whatever feed they are
    /// stored under.
    ///
    /// Useful when the caller holds a filtered view of a feed.
    pub fn catchup_feed(&self, feed: &Feed) -> Result<usize, Error> {
        let changed = self.with_tx(|tx| {
            let mut stmt = tx.prepare_cached("UPDATE items SET unread = 0 WHERE unread = 1 AND guid = ?1")?;
            let mut changed = 0;
            for item in &feed.items {
                changed += stmt.execute(params![&item.guid])?;
            }
            Ok(changed)
        })?;
        debug!(feed_url = %feed.url, items = feed.items.len(), changed, "Caught up feed snapshot");
        Ok(changed)
    }

    /// Mark read the items with the given GUIDs, across all feeds.
    pub fn mark_items_read_by_guid<S: AsRef<str>>(&self, guids: &[S]) -> Result<usize, Error> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare_cached("UPDATE items SET unread = 0 WHERE guid = ?1")?;
            let mut changed = 0;
            for guid in guids {
                changed += stmt.execute(params![guid.as_ref()])?;
            }
            Ok(changed)
        })
    }

    /// GUIDs of every read item, soft-deleted ones included.
    pub fn get_read_item_guids(&self) -> Result<Vec<String>, Error> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT guid FROM items WHERE unread = 0 ORDER BY rowid")?;
            let guids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<_>, _>>()?;
            Ok(guids)
        })
    }

    /// Set or clear the soft-delete marker of one item.
    pub fn mark_item_deleted(&self, feed_url: &str, guid: &str, deleted: bool) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE items SET deleted = ?1 WHERE guid = ?2 AND feedurl = ?3",
                params![deleted, guid, feed_url],
            )?;
            Ok(())
        })
    }

    /// Physically remove soft-deleted items of `feed_url` whose GUID is not
    /// in `guids`, the feed's current authoritative GUID list.
    ///
    /// Returns the number of removed items.
    pub fn remove_old_deleted_items<S: AsRef<str>>(&self, feed_url: &str, guids: &[S]) -> Result<usize, Error> {
        let keep: HashSet<&str> = guids.iter().map(|guid| guid.as_ref()).collect();

        let removed = self.with_tx(|tx| {
            let candidates = {
                let mut stmt = tx.prepare_cached("SELECT guid FROM items WHERE feedurl = ?1 AND deleted = 1")?;
                stmt.query_map(params![feed_url], |row| row.get::<_, String>(0))?.collect::<Result<Vec<_>, _>>()?
            };

            let mut delete = tx.prepare_cached("DELETE FROM items WHERE guid = ?1")?;
            let mut removed = 0;
            for guid in candidates.iter().filter(|guid| !keep.contains(guid.as_str())) {
                removed += delete.execute(params![guid])?;
            }
            Ok(removed)
        })?;

        debug!(feed_url, removed, "Removed old deleted items");
        Ok(removed)
    }
}
