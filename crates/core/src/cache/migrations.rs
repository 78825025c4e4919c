//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each migration is a SQL batch that transforms the schema.

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use super::Error;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Migration list, ascending by version.
///
/// A step is applied once, in its own transaction, together with the row
/// recording its version.
pub const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, description: "feeds and items", sql: include_str!("../../migrations/001_feeds_items.sql") },
    Migration { version: 2, description: "replay queue", sql: include_str!("../../migrations/002_replay_queue.sql") },
    Migration {
        version: 3,
        description: "conditional fetch",
        sql: include_str!("../../migrations/003_conditional_fetch.sql"),
    },
    Migration { version: 4, description: "item extras", sql: include_str!("../../migrations/004_item_extras.sql") },
];

/// Version the bundled migration list brings a database to.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Run any pending migrations and return the resulting schema version.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` for the first step that fails; that step
/// is rolled back and the stored version stays at the previous step.
pub fn run(conn: &mut Connection) -> Result<u32, Error> {
    apply(conn, MIGRATIONS)
}

pub(crate) fn apply(conn: &mut Connection, migrations: &[Migration]) -> Result<u32, Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current = current_version(conn)?;
    let mut version = current;

    for migration in migrations.iter().filter(|m| m.version > current) {
        apply_one(conn, migration)
            .map_err(|source| Error::MigrationFailed { version: migration.version, source })?;
        info!(version = migration.version, description = migration.description, "Applied schema migration");
        version = migration.version;
    }

    Ok(version)
}

/// Highest applied version, 0 on a fresh database.
pub fn current_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
}

fn apply_one(conn: &mut Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![migration.version, Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}
