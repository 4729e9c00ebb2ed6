//! Cache configuration and directory resolution.

use crate::error::{Error, Result};
use crate::naming::FilenameStrategy;
use std::path::{Path, PathBuf};

/// Application name used when none is configured.
pub const DEFAULT_APP_NAME: &str = "fscache";

/// Settings shared by every operation on a cache.
///
/// Built once and handed to [`Cache::open`](crate::Cache::open):
///
/// ```no_run
/// use fscache_core::{CacheConfig, FilenameStrategy};
///
/// # fn main() -> fscache_core::Result<()> {
/// let config = CacheConfig::new("my-app")?
///     .with_filename_strategy(FilenameStrategy::Plain)
///     .with_default_expiration(3600);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    app_name: String,
    filename_strategy: FilenameStrategy,
    default_expiration: u64,
    base_dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Create a configuration for `app_name` with hashed filenames and no expiration.
    pub fn new(app_name: impl Into<String>) -> Result<Self> {
        let app_name = app_name.into();
        validate_app_name(&app_name)?;

        Ok(Self {
            app_name,
            filename_strategy: FilenameStrategy::default(),
            default_expiration: 0,
            base_dir: None,
        })
    }

    /// Choose how keys map to filenames.
    pub fn with_filename_strategy(mut self, strategy: FilenameStrategy) -> Self {
        self.filename_strategy = strategy;
        self
    }

    /// Toggle hashed filenames.
    pub fn with_hashed_filenames(self, hashed: bool) -> Self {
        self.with_filename_strategy(if hashed {
            FilenameStrategy::Hashed
        } else {
            FilenameStrategy::Plain
        })
    }

    /// Lifetime in seconds applied by `save`; 0 keeps entries forever.
    pub fn with_default_expiration(mut self, secs: u64) -> Self {
        self.default_expiration = secs;
        self
    }

    /// Place the app directory under `base` instead of the per-user cache directory.
    pub fn with_base_dir(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base.into());
        self
    }

    /// Get the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Get the filename strategy.
    pub fn filename_strategy(&self) -> FilenameStrategy {
        self.filename_strategy
    }

    /// Get the default expiration in seconds.
    pub fn default_expiration(&self) -> u64 {
        self.default_expiration
    }

    /// Get the base directory override, if any.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve the directory holding this app's entries.
    ///
    /// Returns `<base>/<app_name>`. Nothing is created on disk.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let base = match &self.base_dir {
            Some(base) => base.clone(),
            None => default_base_dir()?,
        };
        Ok(base.join(&self.app_name))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            filename_strategy: FilenameStrategy::default(),
            default_expiration: 0,
            base_dir: None,
        }
    }
}

/// The per-user cache directory, falling back to `~/.cache`.
pub fn default_base_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .ok_or_else(|| Error::configuration("cannot determine a per-user cache directory"))
}

fn validate_app_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::configuration("app name cannot be empty"));
    }

    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(Error::configuration(format!(
            "Invalid app name: {} (must not be . or .. or contain path separators)",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_app_name_rejected() {
        let err = CacheConfig::new("").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_path_like_app_name_rejected() {
        for name in [".", "..", "a/b", "a\\b"] {
            assert!(CacheConfig::new(name).is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new("app").unwrap();
        assert_eq!(config.app_name(), "app");
        assert_eq!(config.filename_strategy(), FilenameStrategy::Hashed);
        assert_eq!(config.default_expiration(), 0);
        assert!(config.base_dir().is_none());

        let fallback = CacheConfig::default();
        assert_eq!(fallback.app_name(), DEFAULT_APP_NAME);
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::new("app")
            .unwrap()
            .with_hashed_filenames(false)
            .with_default_expiration(90)
            .with_base_dir("/tmp/base");

        assert_eq!(config.filename_strategy(), FilenameStrategy::Plain);
        assert_eq!(config.default_expiration(), 90);
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/base/app"));
    }

    #[test]
    fn test_cache_dir_without_override_ends_with_app_name() {
        // Skipped on hosts with neither a cache nor a home directory.
        if let Ok(dir) = CacheConfig::new("some-app").unwrap().cache_dir() {
            assert!(dir.ends_with("some-app"));
        }
    }
}
