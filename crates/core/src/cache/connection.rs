//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying pragmas that
//! trade durability for write throughput (the cache can always be rebuilt
//! by fetching the feeds again), and running migrations.

use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use super::migrations;
use crate::Error;
use crate::config::CacheConfig;

/// Path that opens a process-lifetime database instead of a file.
pub const IN_MEMORY: &str = ":memory:";

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=OFF;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Feed cache handle.
///
/// Owns a single SQLite connection behind a mutex. Every operation takes the
/// lock for the whole of its statement sequence, so operations from
/// different threads are fully serialized. Share it as `Arc<FeedCache>`.
#[derive(Debug)]
pub struct FeedCache {
    conn: Mutex<Connection>,
    config: RwLock<CacheConfig>,
}

impl FeedCache {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// runs any pending migrations, then sweeps articles older than the
    /// configured retention horizon.
    ///
    /// # Errors
    ///
    /// `Error::Open` if the file cannot be opened or configured,
    /// `Error::MigrationFailed` if the schema cannot be brought up to date.
    pub fn open(path: impl AsRef<Path>, config: CacheConfig) -> Result<Self, Error> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let conn = Connection::open(path).map_err(|source| Error::Open { path: display.clone(), source })?;
        Self::init(conn, &display, config)
    }

    /// Open an in-memory database.
    ///
    /// Same configuration as a file-backed database; contents vanish when the
    /// handle is dropped.
    pub fn open_in_memory(config: CacheConfig) -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(|source| Error::Open { path: IN_MEMORY.into(), source })?;
        Self::init(conn, IN_MEMORY, config)
    }

    /// Open the database named by `config.db_path`.
    pub fn from_config(config: CacheConfig) -> Result<Self, Error> {
        let path = config.db_path.clone();
        Self::open(path, config)
    }

    fn init(mut conn: Connection, path: &str, config: CacheConfig) -> Result<Self, Error> {
        conn.execute_batch(PRAGMAS).map_err(|source| Error::Open { path: path.to_string(), source })?;

        let version = migrations::run(&mut conn)?;
        info!(path, version, "Feed cache opened");

        let cache = Self { conn: Mutex::new(conn), config: RwLock::new(config) };
        cache.clean_old_articles()?;

        Ok(cache)
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Result<CacheConfig, Error> {
        Ok(self.config.read()?.clone())
    }

    /// Replace the active configuration.
    ///
    /// Takes effect for the next operation that reads a setting.
    pub fn set_config(&self, config: CacheConfig) -> Result<(), Error> {
        *self.config.write()? = config;
        Ok(())
    }

    /// Schema version currently recorded in the database.
    pub fn schema_version(&self) -> Result<u32, Error> {
        self.with_conn(|conn| Ok(migrations::current_version(conn)?))
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// The lock is held until `f` returns, on every path.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        let conn = self.conn.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction with exclusive access to the connection.
    ///
    /// Commits when `f` returns `Ok`; any error drops the transaction, which
    /// rolls it back.
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, Error>) -> Result<T, Error> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Compact the database file.
    ///
    /// Logical content is untouched.
    pub fn do_vacuum(&self) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute_batch("VACUUM")?;
            debug!("Vacuumed feed cache");
            Ok(())
        })
    }
}
