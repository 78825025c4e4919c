//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FEEDCACHE_*)
//! 2. TOML config file (if FEEDCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use chrono::Duration;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Cache configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FEEDCACHE_*)
/// 2. TOML config file (if FEEDCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// Keys are kebab-case, the way reader config files spell them
/// (`cleanup-on-quit`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via FEEDCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Drop feeds and items the caller no longer tracks in `cleanup_cache`.
    ///
    /// Set via FEEDCACHE_CLEANUP_ON_QUIT environment variable.
    #[serde(default)]
    pub cleanup_on_quit: bool,

    /// Retention horizon in days; 0 disables age-based deletion.
    ///
    /// Set via FEEDCACHE_KEEP_ARTICLES_DAYS environment variable.
    #[serde(default)]
    pub keep_articles_days: u32,

    /// Per-feed item limit for externalize and internalize; 0 is unlimited.
    ///
    /// Set via FEEDCACHE_MAX_ITEMS environment variable.
    #[serde(default)]
    pub max_items: usize,

    /// Also delete every read item during `cleanup_cache`.
    ///
    /// Only honoured together with `cleanup_on_quit`.
    #[serde(default)]
    pub delete_read_articles_on_quit: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./feedcache.db")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cleanup_on_quit: false,
            keep_articles_days: 0,
            max_items: 0,
            delete_read_articles_on_quit: false,
        }
    }
}

impl CacheConfig {
    /// Retention horizon as a Duration, or None when disabled.
    pub fn retention(&self) -> Option<Duration> {
        match self.keep_articles_days {
            0 => None,
            days => Some(Duration::days(i64::from(days))),
        }
    }

    /// Item limit, or None when unlimited.
    pub fn item_limit(&self) -> Option<usize> {
        match self.max_items {
            0 => None,
            n => Some(n),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FEEDCACHE_`
    /// 2. TOML file from `FEEDCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FEEDCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FEEDCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().replace('_', "-").into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
