//! Unified error types for feedcache.
//!
//! Every variant renders with a stable code prefix so callers can match on
//! the message when they only have the string form.

use crate::config::ConfigError;

/// Unified error type for every cache operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The database file could not be created, opened, or configured.
    #[error("OPEN_FAILED: {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A schema migration failed; the stored version was left unchanged.
    #[error("MIGRATION_FAILED: version {version}: {source}")]
    MigrationFailed {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed inside an otherwise healthy store.
    #[error("QUERY_FAILED: {0}")]
    Database(rusqlite::Error),

    /// Another thread panicked while holding the connection or config lock.
    #[error("CACHE_ERROR: lock poisoned")]
    LockPoisoned,

    /// Configuration could not be loaded or did not validate.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}
