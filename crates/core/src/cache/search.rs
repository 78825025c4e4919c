//! Substring search over stored items.

use rusqlite::params;
use tracing::debug;

use super::connection::FeedCache;
use super::items::{item_columns, item_from_row};
use crate::Error;
use crate::model::Item;

/// Turn free text into a `LIKE` pattern matching it as a literal substring.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl FeedCache {
    /// Find items whose title or description contains `query`.
    ///
    /// Matching is case-insensitive for ASCII. `feed_url` limits the search
    /// to one feed; `None` or an empty URL searches everything. Soft-deleted items are not
    /// returned. Results come newest first and reflect stored state at the
    /// time of the call; read state is not touched.
    pub fn search_for_items(&self, query: &str, feed_url: Option<&str>) -> Result<Vec<Item>, Error> {
        let pattern = like_pattern(query);
        let feed_url = feed_url.filter(|url| !url.is_empty());

        let items = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(concat!(
                "SELECT ",
                item_columns!(),
                " FROM items
                WHERE (title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
                AND deleted = 0
                AND (?2 IS NULL OR feedurl = ?2)
                ORDER BY pubdate DESC, rowid DESC"
            ))?;
            let items = stmt.query_map(params![pattern, feed_url], item_from_row)?.collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })?;

        debug!(query, feed_url = feed_url.unwrap_or("*"), results = items.len(), "Searched items");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::model::Feed;

    fn make_test_feed(url: &str, entries: &[(&str, &str, &str)]) -> Feed {
        let mut feed = Feed::new(url);
        for (guid, title, description) in entries {
            let mut item = Item::new(*guid);
            item.title = (*title).into();
            item.description = (*description).into();
            feed.add_item(item);
        }
        feed
    }

    fn setup() -> FeedCache {
        let db = FeedCache::open_in_memory(CacheConfig::default()).unwrap();
        db.externalize_feed(
            &make_test_feed(
                "https://a.example/rss",
                &[("a1", "Rust 2024 released", "New edition"), ("a2", "Weather", "100% chance of rain")],
            ),
            false,
        )
        .unwrap();
        db.externalize_feed(
            &make_test_feed("https://b.example/rss", &[("b1", "Cooking", "Why rust forms on cast iron")]),
            false,
        )
        .unwrap();
        db
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let db = setup();
        let mut guids: Vec<_> = db.search_for_items("RUST", None).unwrap().into_iter().map(|i| i.guid).collect();
        guids.sort();
        assert_eq!(guids, vec!["a1", "b1"]);
    }

    #[test]
    fn test_search_scoped_to_feed() {
        let db = setup();
        let items = db.search_for_items("rust", Some("https://b.example/rss")).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "b1");
    }

    #[test]
    fn test_empty_feed_url_searches_everything() {
        let db = setup();
        assert_eq!(db.search_for_items("rust", Some("")).unwrap().len(), 2);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let db = setup();
        let items = db.search_for_items("100%", None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "a2");
        assert!(db.search_for_items("1_0", None).unwrap().is_empty());
    }

    #[test]
    fn test_search_missing_term() {
        let db = setup();
        assert!(db.search_for_items("nothing like this", None).unwrap().is_empty());
    }

    #[test]
    fn test_search_skips_deleted_and_keeps_read_state() {
        let db = setup();
        db.mark_item_deleted("https://b.example/rss", "b1", true).unwrap();
        let items = db.search_for_items("rust", None).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].unread);
        assert_eq!(db.get_unread_count().unwrap(), 3);
    }
}
