//! Conditional-fetch metadata per feed URI.
//!
//! The fetch layer stores the `Last-Modified` and `ETag` values of the last
//! response here and replays them as `If-Modified-Since`/`If-None-Match`.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use super::connection::FeedCache;
use crate::Error;

/// Validators recorded for a URI.
///
/// The default `(0, "")` is returned for URIs never recorded; the cache does
/// not distinguish it from a recorded zero timestamp with an empty tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastModified {
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub etag: String,
}

impl FeedCache {
    /// Get the recorded validators for `uri`, or the default pair.
    pub fn fetch_lastmodified(&self, uri: &str) -> Result<LastModified, Error> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT last_modified, etag FROM conditional_fetch WHERE uri = ?1",
                    params![uri],
                    |row| Ok(LastModified { timestamp: row.get(0)?, etag: row.get(1)? }),
                )
                .optional()?;
            Ok(found.unwrap_or_default())
        })
    }

    /// Record validators for `uri`, replacing any previous pair.
    pub fn update_lastmodified(&self, uri: &str, timestamp: i64, etag: &str) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conditional_fetch (uri, last_modified, etag) VALUES (?1, ?2, ?3)
                ON CONFLICT(uri) DO UPDATE SET
                    last_modified = excluded.last_modified,
                    etag = excluded.etag",
                params![uri, timestamp, etag],
            )?;
            Ok(())
        })
    }
}
