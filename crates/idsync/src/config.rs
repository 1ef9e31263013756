//! # Sync Configuration
//!
//! Configuration management for the reconciliation service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MONGODB_URI, DATABASE_URL, PORT                                    │
//! │     IDSYNC_INTERVAL_MINUTES=5                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, or ~/.config/idsync/idsync.toml (Linux)             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     1 minute cadence, autostart, port 3001                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [scheduler]
//! interval_minutes = 1
//! autostart = true
//! history_size = 10
//!
//! [document_store]
//! uri = "mongodb://localhost:27017"
//! database = "platform"
//! collection = "users"
//!
//! [profile_store]
//! url = "postgres://localhost:5432/postgres"
//! run_migrations = false
//!
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 3001
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use idsync_core::validation::validate_interval_minutes;
use idsync_core::{DEFAULT_HISTORY_SIZE, DEFAULT_INTERVAL_MINUTES};
use idsync_db::{MongoConfig, PgConfig};

// =============================================================================
// Scheduler Settings
// =============================================================================

/// Scheduler behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Minutes between scheduled passes.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Arm the scheduler when the service starts.
    #[serde(default = "default_true")]
    pub autostart: bool,

    /// Finished runs kept in memory for the logs view.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_interval_minutes() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_true() -> bool {
    true
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            interval_minutes: default_interval_minutes(),
            autostart: true,
            history_size: default_history_size(),
        }
    }
}

// =============================================================================
// Server Settings
// =============================================================================

/// Control surface listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Sync Config
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Store A.
    #[serde(default)]
    pub document_store: MongoConfig,

    /// Store B.
    #[serde(default)]
    pub profile_store: PgConfig,

    #[serde(default)]
    pub server: ServerSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (idsync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        validate_interval_minutes(self.scheduler.interval_minutes).map_err(SyncError::config)?;

        if self.scheduler.history_size == 0 {
            return Err(SyncError::InvalidConfig(
                "history_size must be greater than 0".into(),
            ));
        }

        let uri = &self.document_store.uri;
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(SyncError::InvalidConfig(format!(
                "document_store.uri must start with mongodb:// or mongodb+srv://, got: {}",
                uri
            )));
        }

        let url = &self.profile_store.url;
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(SyncError::InvalidConfig(
                "profile_store.url must start with postgres:// or postgresql://".into(),
            ));
        }

        if self.profile_store.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "profile_store.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Interval
        if let Some(minutes) = var("IDSYNC_INTERVAL_MINUTES") {
            match minutes.parse::<u64>() {
                Ok(m) => {
                    debug!(interval_minutes = m, "Overriding interval from environment");
                    self.scheduler.interval_minutes = m;
                }
                Err(_) => warn!(value = %minutes, "Ignoring non-numeric IDSYNC_INTERVAL_MINUTES"),
            }
        }

        // Autostart
        if let Some(flag) = var("IDSYNC_AUTOSTART") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.scheduler.autostart = true,
                "0" | "false" | "no" => self.scheduler.autostart = false,
                _ => warn!(value = %flag, "Unknown IDSYNC_AUTOSTART value"),
            }
        }

        if let Some(size) = var("IDSYNC_HISTORY_SIZE") {
            if let Ok(n) = size.parse::<usize>() {
                self.scheduler.history_size = n;
            }
        }

        // Store A
        if let Some(uri) = var("MONGODB_URI") {
            debug!("Overriding document store URI from environment");
            self.document_store.uri = uri;
        }
        if let Some(database) = var("IDSYNC_MONGODB_DATABASE") {
            self.document_store.database = database;
        }

        // Store B
        if let Some(url) = var("DATABASE_URL") {
            debug!("Overriding profile store URL from environment");
            self.profile_store.url = url;
        }
        if let Some(flag) = var("IDSYNC_RUN_MIGRATIONS") {
            self.profile_store.run_migrations = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        // Server
        if let Some(port) = var("IDSYNC_PORT").or_else(|| var("PORT")) {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding server port from environment");
                self.server.port = p;
            }
        }
        if let Some(addr) = var("IDSYNC_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "idsync", "idsync")
            .map(|dirs| dirs.config_dir().join("idsync.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.scheduler.interval_minutes, 1);
        assert!(config.scheduler.autostart);
        assert_eq!(config.scheduler.history_size, 10);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.document_store.collection, "users");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.scheduler.interval_minutes = 0;
        assert!(config.validate().is_err());
        config.scheduler.interval_minutes = 5;
        assert!(config.validate().is_ok());

        config.document_store.uri = "http://localhost".to_string();
        assert!(config.validate().is_err());
        config.document_store.uri = "mongodb+srv://cluster0.example.net".to_string();
        assert!(config.validate().is_ok());

        config.profile_store.url = "mysql://localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("IDSYNC_INTERVAL_MINUTES", "15"),
            ("IDSYNC_AUTOSTART", "false"),
            ("MONGODB_URI", "mongodb://mongo:27017"),
            ("DATABASE_URL", "postgres://pg/app"),
            ("PORT", "8080"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.scheduler.interval_minutes, 15);
        assert!(!config.scheduler.autostart);
        assert_eq!(config.document_store.uri, "mongodb://mongo:27017");
        assert_eq!(config.profile_store.url, "postgres://pg/app");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [scheduler]
            interval_minutes = 30

            [profile_store]
            run_migrations = true
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.interval_minutes, 30);
        assert!(config.scheduler.autostart);
        assert!(config.profile_store.run_migrations);
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[scheduler]"));
        assert!(toml_str.contains("[document_store]"));
        assert!(toml_str.contains("[profile_store]"));
    }
}
