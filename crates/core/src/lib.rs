//! Persistence and synchronization layer for a feed reader.
//!
//! This crate provides:
//! - Feed cache implementation with SQLite backend
//! - The feed/item model the cache exchanges with its callers
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{CleanupReport, FeedCache, LastModified, ReplayAction, ReplayEntry};
pub use config::CacheConfig;
pub use error::Error;
pub use model::{Feed, IgnoreRules, Item, NoIgnores};
