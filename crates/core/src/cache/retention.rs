//! Purge strategies.
//!
//! Two independent sweeps with different triggers: age-based deletion runs
//! on every open when a horizon is configured, caller-driven cleanup only
//! when `cleanup-on-quit` is enabled.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use tracing::{debug, info};

use super::connection::FeedCache;
use crate::Error;
use crate::model::Feed;

/// What a `cleanup_cache` run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub feeds_removed: usize,
    pub items_removed: usize,
}

impl FeedCache {
    /// Delete items published before `now - keep-articles-days`.
    ///
    /// No-op when the horizon is 0. Feed rows and newer items are untouched.
    /// Returns the number of deleted items.
    pub fn clean_old_articles(&self) -> Result<usize, Error> {
        let Some(horizon) = self.config()?.retention() else {
            return Ok(0);
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(horizon) else {
            return Ok(0);
        };

        let removed = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM items WHERE pubdate < ?1", params![cutoff.timestamp()])?)
        })?;

        info!(days = horizon.num_days(), removed, "Removed articles past retention horizon");
        Ok(removed)
    }

    /// Drop everything the caller no longer tracks.
    ///
    /// Only acts when `cleanup-on-quit` is enabled. `feeds` is the complete
    /// list of feeds the caller still cares about: stored feeds missing from
    /// it are deleted with all their items, and for each listed feed that
    /// carries items, stored items absent from it are deleted. With
    /// `delete-read-articles-on-quit` every read item goes as well. Runs in
    /// one transaction.
    pub fn cleanup_cache(&self, feeds: &[Feed]) -> Result<CleanupReport, Error> {
        let config = self.config()?;
        if !config.cleanup_on_quit {
            debug!("cleanup-on-quit disabled, leaving cache untouched");
            return Ok(CleanupReport::default());
        }

        let tracked: HashSet<&str> = feeds.iter().map(|feed| feed.url.as_str()).collect();

        let report = self.with_tx(|tx| {
            let mut report = CleanupReport::default();

            let stored_urls = {
                let mut stmt = tx.prepare("SELECT url FROM feeds UNION SELECT feedurl FROM items")?;
                stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<Result<Vec<_>, _>>()?
            };

            let mut delete_feed_items = tx.prepare_cached("DELETE FROM items WHERE feedurl = ?1")?;
            let mut delete_feed = tx.prepare_cached("DELETE FROM feeds WHERE url = ?1")?;
            for url in stored_urls.iter().filter(|url| !tracked.contains(url.as_str())) {
                report.items_removed += delete_feed_items.execute(params![url])?;
                report.feeds_removed += delete_feed.execute(params![url])?;
            }

            let mut select_guids = tx.prepare_cached("SELECT guid FROM items WHERE feedurl = ?1")?;
            let mut delete_item = tx.prepare_cached("DELETE FROM items WHERE guid = ?1")?;
            for feed in feeds.iter().filter(|feed| !feed.items.is_empty()) {
                let current: HashSet<&str> = feed.items.iter().map(|item| item.guid.as_str()).collect();
                let stored = select_guids
                    .query_map(params![&feed.url], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                for guid in stored.iter().filter(|guid| !current.contains(guid.as_str())) {
                    report.items_removed += delete_item.execute(params![guid])?;
                }
            }

            if config.delete_read_articles_on_quit {
                report.items_removed += tx.execute("DELETE FROM items WHERE unread = 0", [])?;
            }

            Ok(report)
        })?;

        info!(feeds_removed = report.feeds_removed, items_removed = report.items_removed, "Cleaned up cache");
        Ok(report)
    }
}
