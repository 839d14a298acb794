//! Console configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional
//! `bazaar.toml`, then `BAZAAR_*` environment variables.
//!
//! ```toml
//! # bazaar.toml
//! database_path = "/var/lib/bazaar/bazaar.db"
//! max_connections = 5
//! log_filter = "info,bazaar=debug,sqlx=warn"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use bazaar_db::DbConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,bazaar=debug,sqlx=warn";

/// Console configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Seconds a writer waits for the SQLite lock
    pub busy_timeout_secs: u64,

    /// tracing-subscriber filter directive
    pub log_filter: String,
}

impl ConsoleConfig {
    /// Loads configuration, reading `file` if given, else `./bazaar.toml`
    /// when it exists.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("bazaar").required(false),
        };

        let config: ConsoleConfig = Config::builder()
            .set_default("database_path", "bazaar.db")?
            .set_default("max_connections", 5)?
            .set_default("busy_timeout_secs", 5)?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?
            .add_source(file_source)
            .add_source(Environment::with_prefix("BAZAAR").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        Ok(())
    }

    /// Pool settings for [`bazaar_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error(transparent)]
    Source(#[from] config::ConfigError),
}
