//! # Configuration
//!
//! Optional `emporium.toml` file, overridden by command-line flags.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [store]
//! path = "emporium.redb"
//!
//! [store.reset]
//! users = 5000
//! products = 10000
//! comments = 200000
//! histories = 500000
//! ```
//!
//! Security knobs stay in the environment (`EMPORIUM_CORS_ORIGINS`,
//! `EMPORIUM_RATE_LIMIT`), see [`crate::api`].

use emporium_core::{CacheError, ResetThresholds};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "emporium.toml";

/// Largest config file we are willing to parse (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Location of the redb database file.
    pub path: PathBuf,
    /// Id thresholds applied by `reset` and `POST /initialize`.
    pub reset: ResetThresholds,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("emporium.redb"),
            reset: ResetThresholds::default(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
}

impl AppConfig {
    /// Resolve the configuration.
    ///
    /// An explicit path must exist. Without one, `emporium.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CacheError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CacheError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            CacheError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CacheError::InvalidInput(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| CacheError::IoError(format!("Read config: {}", e)))?;
        let config = Self::from_toml(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, CacheError> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| CacheError::SerializationError(format!("Invalid config: {}", e)))?;
        if config.server.host.trim().is_empty() {
            return Err(CacheError::InvalidInput(
                "server.host must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Apply command-line overrides on top of the file values.
    #[must_use]
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Self {
        if let Some(path) = database {
            self.store.path = path;
        }
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================
