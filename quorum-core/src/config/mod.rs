//! Configuration management
//!
//! Environment-based configuration with TOML file support, defaults and
//! validation. Environment variables follow the pattern
//! `QUORUM_<SECTION>_<KEY>` and override file/default values.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Secondary admin-gate configuration
    pub admin: AdminGateConfig,

    /// Listing configuration
    pub listing: ListingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory: database file and admin-session flag live here
    pub data_dir: PathBuf,
}

/// Secondary admin-gate configuration
///
/// The fixed credential pair for the dashboard entry point and the
/// validity window of a granted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminGateConfig {
    pub username: String,
    pub password: String,

    /// How long a granted admin session stays valid
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

/// Listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Page size used when the caller does not specify one
    pub default_page_size: u32,

    /// Hard cap on requested page sizes
    pub max_page_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            admin: AdminGateConfig::default(),
            listing: ListingConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for AdminGateConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from environment variables over the defaults
    ///
    /// Example: QUORUM_STORE_DATA_DIR=/var/lib/quorum
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Store config
        if let Ok(data_dir) = env::var("QUORUM_STORE_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }

        // Admin gate config
        if let Ok(username) = env::var("QUORUM_ADMIN_USERNAME") {
            config.admin.username = username;
        }
        if let Ok(password) = env::var("QUORUM_ADMIN_PASSWORD") {
            config.admin.password = password;
        }
        if let Ok(ttl) = env::var("QUORUM_ADMIN_SESSION_TTL_SECS") {
            let secs: u64 = ttl
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid session TTL: {}", e)))?;
            config.admin.session_ttl = Duration::from_secs(secs);
        }

        // Listing config
        if let Ok(page_size) = env::var("QUORUM_LISTING_DEFAULT_PAGE_SIZE") {
            config.listing.default_page_size = page_size
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid page size: {}", e)))?;
        }
        if let Ok(max) = env::var("QUORUM_LISTING_MAX_PAGE_SIZE") {
            config.listing.max_page_size = max
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid max page size: {}", e)))?;
        }

        // Logging config
        if let Ok(level) = env::var("QUORUM_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("QUORUM_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        // Metrics config
        if let Ok(enabled) = env::var("QUORUM_METRICS_ENABLED") {
            config.metrics.enabled = enabled
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid metrics flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.username.is_empty() || self.admin.password.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "admin credentials must not be empty".to_string(),
            ));
        }

        if self.admin.session_ttl.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "admin session TTL must be greater than 0".to_string(),
            ));
        }

        if self.listing.default_page_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "default_page_size must be greater than 0".to_string(),
            ));
        }

        if self.listing.max_page_size < self.listing.default_page_size {
            return Err(ConfigError::ValidationFailed(
                "max_page_size must be at least default_page_size".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
