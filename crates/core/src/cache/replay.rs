//! Queue of read-state changes waiting to be replayed on a remote service.
//!
//! At most one pending action exists per GUID; recording a new action for a
//! GUID replaces the old one.

use chrono::Utc;
use rusqlite::params;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::connection::FeedCache;
use crate::Error;

/// Pending remote action, stored as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayAction {
    MarkRead = 1,
    MarkUnread = 2,
}

impl ToSql for ReplayAction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(*self as i64))
    }
}

impl FromSql for ReplayAction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_i64()? {
            1 => Ok(ReplayAction::MarkRead),
            2 => Ok(ReplayAction::MarkUnread),
            other => Err(FromSqlError::OutOfRange(other)),
        }
    }
}

/// One queued action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub guid: String,
    pub action: ReplayAction,
}

impl FeedCache {
    /// Queue `action` for `guid`, replacing any action already queued for it.
    pub fn record_replay(&self, guid: &str, action: ReplayAction) -> Result<(), Error> {
        let recorded_at = Utc::now().timestamp_micros();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO replay_queue (guid, state, recorded_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(guid) DO UPDATE SET
                    state = excluded.state,
                    recorded_at = excluded.recorded_at",
                params![guid, action, recorded_at],
            )?;
            Ok(())
        })?;
        debug!(guid, ?action, "Recorded replay action");
        Ok(())
    }

    /// All queued actions, oldest first.
    pub fn get_replay(&self) -> Result<Vec<ReplayEntry>, Error> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT guid, state FROM replay_queue ORDER BY recorded_at, rowid")?;
            let entries = stmt
                .query_map([], |row| Ok(ReplayEntry { guid: row.get(0)?, action: row.get(1)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Drop queued actions for exactly these GUIDs, typically after the
    /// remote service confirmed them.
    pub fn delete_replay_by_guid<S: AsRef<str>>(&self, guids: &[S]) -> Result<usize, Error> {
        let removed = self.with_tx(|tx| {
            let mut stmt = tx.prepare_cached("DELETE FROM replay_queue WHERE guid = ?1")?;
            let mut removed = 0;
            for guid in guids {
                removed += stmt.execute(params![guid.as_ref()])?;
            }
            Ok(removed)
        })?;
        debug!(removed, "Deleted replay actions");
        Ok(removed)
    }
}
