//! Server configuration.
//!
//! Loaded in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `duka.toml` (or the file named by `DUKA_CONFIG`), if present
//! 3. `DUKA_*` environment variables, e.g. `DUKA_BIND_ADDR=0.0.0.0:8080`

use std::net::SocketAddr;
use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

/// Default `RUST_LOG` when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,duka=debug,sqlx=warn,tower_http=info";

/// API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: String,

    /// SQLite database file.
    pub database_path: PathBuf,

    /// Maximum pooled database connections.
    pub db_max_connections: u32,

    /// Mark the session cookie `Secure` (set behind HTTPS).
    pub session_secure: bool,

    /// Sessions expire after this many hours without a request.
    pub session_expiry_hours: i64,

    /// Let anyone register an employee account after the first admin
    /// exists. Off by default.
    pub allow_self_registration: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl AppConfig {
    /// Load from the config file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DUKA_CONFIG").unwrap_or_else(|_| "duka.toml".to_string());

        let config = defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("DUKA").try_parsing(true))
            .build()?
            .try_deserialize::<AppConfig>()?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML document. Environment is ignored.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<AppConfig>()?;

        config.validate()?;
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "bind_addr",
                reason: format!("'{}' is not a host:port address", self.bind_addr),
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "db_max_connections",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.session_expiry_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "session_expiry_hours",
                reason: "must be positive".to_string(),
            });
        }

        Ok(())
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("bind_addr", "127.0.0.1:3000")?
        .set_default(
            "database_path",
            default_database_path().to_string_lossy().into_owned(),
        )?
        .set_default("db_max_connections", 5_i64)?
        .set_default("session_secure", false)?
        .set_default("session_expiry_hours", 12_i64)?
        .set_default("allow_self_registration", false)?
        .set_default("log_json", false)?)
}

/// `duka.db` in the platform data directory, or the working directory when
/// there is no home directory.
pub fn default_database_path() -> PathBuf {
    ProjectDirs::from("com", "DukaSmart", "duka")
        .map(|dirs| dirs.data_dir().join("duka.db"))
        .unwrap_or_else(|| PathBuf::from("duka.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
