//! SQLite-backed cache for feeds, items and synchronization state.
//!
//! This module provides the persistence layer of a feed reader using a
//! single SQLite connection guarded by a mutex. It supports:
//!
//! - GUID-keyed reconciliation of freshly fetched items with stored ones
//! - Automatic schema migrations
//! - Age-based and caller-driven purge strategies
//! - Read-state bookkeeping and substring search
//! - Conditional-fetch metadata and a replay queue for remote read state

pub mod conditional;
pub mod connection;
pub mod items;
pub mod migrations;
pub mod read_state;
pub mod replay;
pub mod retention;
pub mod search;

pub use crate::Error;

pub use conditional::LastModified;
pub use connection::{FeedCache, IN_MEMORY};
pub use replay::{ReplayAction, ReplayEntry};
pub use retention::CleanupReport;
