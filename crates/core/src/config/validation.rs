//! Configuration validation rules.
//!
//! This module provides validation logic for `CacheConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::CacheConfig;
use thiserror::Error;

/// Longest retention horizon accepted, roughly a century.
const MAX_KEEP_ARTICLES_DAYS: u32 = 36_500;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `db-path` is empty
    /// - `keep-articles-days` exceeds 36500
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "db-path".into(), reason: "must not be empty".into() });
        }

        if self.keep_articles_days > MAX_KEEP_ARTICLES_DAYS {
            return Err(ConfigError::Invalid {
                field: "keep-articles-days".into(),
                reason: format!("must not exceed {MAX_KEEP_ARTICLES_DAYS} days"),
            });
        }

        if self.delete_read_articles_on_quit && !self.cleanup_on_quit {
            tracing::warn!(
                delete_read_articles_on_quit = self.delete_read_articles_on_quit,
                cleanup_on_quit = self.cleanup_on_quit,
                "delete-read-articles-on-quit has no effect unless cleanup-on-quit is enabled"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_db_path() {
        let config = CacheConfig { db_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "db-path"));
    }

    #[test]
    fn test_validate_horizon_too_long() {
        let config = CacheConfig { keep_articles_days: MAX_KEEP_ARTICLES_DAYS + 1, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "keep-articles-days"));
    }

    #[test]
    fn test_validate_max_horizon() {
        let config = CacheConfig { keep_articles_days: MAX_KEEP_ARTICLES_DAYS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_delete_read_without_cleanup_is_allowed() {
        let config = CacheConfig { delete_read_articles_on_quit: true, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
