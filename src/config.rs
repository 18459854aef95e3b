//! Configuration types for the processing core
//!
//! The processing core is configured by an external settings owner; this
//! module provides the typed surface it fills in, either programmatically
//! through the builder or from the process environment.

use crate::error::{MatteError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the durable cache directory
pub const ENV_CACHE_DIR: &str = "BG_MATTE_CACHE_DIR";
/// Environment variable setting the in-memory cache entry capacity
pub const ENV_CACHE_SIZE: &str = "BG_MATTE_CACHE_SIZE";
/// Environment variable setting the number of concurrent matting permits
pub const ENV_MAX_WORKERS: &str = "BG_MATTE_MAX_WORKERS";
/// Environment variable setting the output encoding quality (0-100)
pub const ENV_OUTPUT_QUALITY: &str = "BG_MATTE_OUTPUT_QUALITY";
/// Environment variable enabling durable result retention
pub const ENV_KEEP_RESULTS: &str = "BG_MATTE_KEEP_RESULTS";

/// Configuration for the background removal processing core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatteConfig {
    /// Directory for the durable result cache tier
    pub cache_dir: PathBuf,

    /// Entry capacity of the in-memory cache tier
    pub cache_capacity: usize,

    /// Number of matting operations allowed to run concurrently
    pub max_workers: usize,

    /// Output encoding quality (0-100); maps to PNG compression effort
    pub output_quality: u8,

    /// Mirror results into the durable cache tier
    ///
    /// When disabled, results live only in the in-memory tier for the
    /// process lifetime and the durable tier is never consulted.
    pub keep_results: bool,
}

impl Default for MatteConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_capacity: 1000,
            max_workers: 4,
            output_quality: 95,
            keep_results: false,
        }
    }
}

/// Default durable cache location
///
/// Uses the XDG cache directory when available:
/// - Linux/macOS: `~/.cache/bg-matte/results/`
/// - Windows: `%LOCALAPPDATA%/bg-matte/results/`
///
/// Falls back to the system temporary directory when no user cache
/// directory can be determined.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bg-matte")
        .join("results")
}

impl MatteConfig {
    /// Create a new configuration builder for fluent API construction
    #[must_use]
    pub fn builder() -> MatteConfigBuilder {
        MatteConfigBuilder::new()
    }

    /// Load configuration from the process environment
    ///
    /// Unset variables fall back to their defaults; set variables must
    /// parse, so a malformed value is a configuration error rather than a
    /// silently applied default.
    ///
    /// # Errors
    /// - A set variable fails to parse as its expected type
    /// - The resulting configuration fails validation
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            builder = builder.cache_dir(PathBuf::from(dir));
        }
        if let Ok(raw) = std::env::var(ENV_CACHE_SIZE) {
            let capacity = raw.parse::<usize>().map_err(|_| {
                MatteError::config_value_error(ENV_CACHE_SIZE, raw, "positive integer")
            })?;
            builder = builder.cache_capacity(capacity);
        }
        if let Ok(raw) = std::env::var(ENV_MAX_WORKERS) {
            let workers = raw.parse::<usize>().map_err(|_| {
                MatteError::config_value_error(ENV_MAX_WORKERS, raw, "positive integer")
            })?;
            builder = builder.max_workers(workers);
        }
        if let Ok(raw) = std::env::var(ENV_OUTPUT_QUALITY) {
            let quality = raw
                .parse::<u8>()
                .map_err(|_| MatteError::config_value_error(ENV_OUTPUT_QUALITY, raw, "0-100"))?;
            builder = builder.output_quality(quality);
        }
        if let Ok(raw) = std::env::var(ENV_KEEP_RESULTS) {
            builder = builder.keep_results(raw.eq_ignore_ascii_case("true") || raw == "1");
        }

        builder.build()
    }
}

/// Builder for [`MatteConfig`]
pub struct MatteConfigBuilder {
    config: MatteConfig,
}

impl MatteConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatteConfig::default(),
        }
    }

    #[must_use]
    pub fn cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = workers;
        self
    }

    #[must_use]
    pub fn output_quality(mut self, quality: u8) -> Self {
        self.config.output_quality = quality;
        self
    }

    #[must_use]
    pub fn keep_results(mut self, keep: bool) -> Self {
        self.config.keep_results = keep;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `MatteError::InvalidConfig` for:
    /// - Output quality above 100
    /// - Zero cache capacity or zero workers
    pub fn build(self) -> Result<MatteConfig> {
        if self.config.output_quality > 100 {
            return Err(MatteError::config_value_error(
                "output quality",
                self.config.output_quality,
                "0-100",
            ));
        }
        if self.config.cache_capacity == 0 {
            return Err(MatteError::invalid_config(
                "cache capacity must be at least 1",
            ));
        }
        if self.config.max_workers == 0 {
            return Err(MatteError::invalid_config("max workers must be at least 1"));
        }

        Ok(self.config)
    }
}

impl Default for MatteConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MatteConfig::default();
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.output_quality, 95);
        assert!(!config.keep_results);
    }

    #[test]
    fn test_builder() {
        let config = MatteConfig::builder()
            .cache_dir("/tmp/matte-test")
            .cache_capacity(16)
            .max_workers(2)
            .output_quality(80)
            .keep_results(true)
            .build()
            .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/matte-test"));
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.output_quality, 80);
        assert!(config.keep_results);
    }

    #[test]
    fn test_builder_validation() {
        assert!(MatteConfig::builder().output_quality(101).build().is_err());
        assert!(MatteConfig::builder().cache_capacity(0).build().is_err());
        assert!(MatteConfig::builder().max_workers(0).build().is_err());
    }

    // Environment interactions live in one test; parallel tests sharing
    // process environment would race.
    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_CACHE_SIZE, "32");
        std::env::set_var(ENV_MAX_WORKERS, "8");
        std::env::set_var(ENV_KEEP_RESULTS, "true");

        let config = MatteConfig::from_env().unwrap();
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.max_workers, 8);
        assert!(config.keep_results);

        // A set-but-malformed value is an error, not a silent default.
        std::env::set_var(ENV_OUTPUT_QUALITY, "lossless");
        assert!(MatteConfig::from_env().is_err());

        std::env::remove_var(ENV_CACHE_SIZE);
        std::env::remove_var(ENV_MAX_WORKERS);
        std::env::remove_var(ENV_KEEP_RESULTS);
        std::env::remove_var(ENV_OUTPUT_QUALITY);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = MatteConfig::builder()
            .cache_capacity(5)
            .keep_results(true)
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: MatteConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
