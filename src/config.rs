//! Configuration management for the task runner.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `TASK_STORE` - Optional. `memory` or `sqlite`. Defaults to `sqlite`.
//! - `TASK_RUNNER_DB` - Optional. SQLite database file. Defaults to `task_runner.db`.
//! - `TASK_RUNNER_RESET_DB` - Optional. Delete and recreate the database at startup. Defaults to `false`.
//! - `SEED_DEMO_TASKS` - Optional. Seed demo tasks into an empty store. Defaults to `true`.
//! - `REQUIRE_PLAN_APPROVAL` - Optional. Refuse to execute planned tasks without an approved plan. Defaults to `true`.
//! - `STREAM_POLL_INTERVAL_MS` - Optional. Audit stream poll interval. Defaults to `1000`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::task_store::TaskStoreType;
use crate::util::env_var_bool;

pub const DEFAULT_DB_PATH: &str = "task_runner.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Which backend holds tasks
    pub store_type: TaskStoreType,

    /// SQLite database file (ignored by the memory backend)
    pub db_path: PathBuf,

    /// Delete the database file before opening it
    pub reset_on_start: bool,

    /// Insert demo tasks when the store is empty
    pub seed_demo_tasks: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: TaskStoreType::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            reset_on_start: false,
            seed_demo_tasks: true,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Storage configuration
    pub store: StoreConfig,

    /// Block execution of planned tasks until their plan is approved
    pub require_plan_approval: bool,

    /// How often the audit stream re-checks the store
    pub stream_poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `PORT` or `STREAM_POLL_INTERVAL_MS`
    /// is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let poll_ms: u64 = std::env::var("STREAM_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("STREAM_POLL_INTERVAL_MS".to_string(), format!("{}", e))
            })?;

        let store = StoreConfig {
            store_type: std::env::var("TASK_STORE")
                .map(|s| TaskStoreType::from_str(&s))
                .unwrap_or_default(),
            db_path: std::env::var("TASK_RUNNER_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
            reset_on_start: env_var_bool("TASK_RUNNER_RESET_DB", false),
            seed_demo_tasks: env_var_bool("SEED_DEMO_TASKS", true),
        };

        Ok(Self {
            host,
            port,
            store,
            require_plan_approval: env_var_bool("REQUIRE_PLAN_APPROVAL", true),
            stream_poll_interval: Duration::from_millis(poll_ms.max(1)),
        })
    }

    /// Create a config backed by an in-memory store (useful for testing).
    pub fn in_memory() -> Self {
        Self {
            store: StoreConfig {
                store_type: TaskStoreType::Memory,
                seed_demo_tasks: false,
                ..StoreConfig::default()
            },
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            store: StoreConfig::default(),
            require_plan_approval: true,
            stream_poll_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.store.store_type, TaskStoreType::Sqlite);
        assert_eq!(config.store.db_path, PathBuf::from("task_runner.db"));
        assert!(config.require_plan_approval);
        assert_eq!(config.stream_poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_in_memory_config_skips_seeding() {
        let config = Config::in_memory();
        assert_eq!(config.store.store_type, TaskStoreType::Memory);
        assert!(!config.store.seed_demo_tasks);
    }
}
