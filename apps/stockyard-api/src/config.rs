//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockyard_db::DbConfig;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Interface to bind
    pub bind_address: String,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Writer-lock wait in seconds
    pub db_busy_timeout_secs: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            http_port: lookup("STOCKYARD_HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STOCKYARD_HTTP_PORT".to_string()))?,

            bind_address: lookup("STOCKYARD_BIND_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0".to_string()),

            database_path: lookup("STOCKYARD_DATABASE_PATH")
                .unwrap_or_else(|| "./stockyard.db".to_string())
                .into(),

            db_max_connections: lookup("STOCKYARD_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("STOCKYARD_DB_MAX_CONNECTIONS".to_string())
                })?,

            db_busy_timeout_secs: lookup("STOCKYARD_DB_BUSY_TIMEOUT_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("STOCKYARD_DB_BUSY_TIMEOUT_SECS".to_string())
                })?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKYARD_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if config.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired(
                "STOCKYARD_DATABASE_PATH".to_string(),
            ));
        }

        Ok(config)
    }

    /// Socket address the server listens on.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_address, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("STOCKYARD_BIND_ADDRESS".to_string()))
    }

    /// Storage configuration derived from this config.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_secs(self.db_busy_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.database_path, PathBuf::from("./stockyard.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.listen_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_overrides_flow_into_db_config() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("STOCKYARD_HTTP_PORT", "9000"),
            ("STOCKYARD_BIND_ADDRESS", "127.0.0.1"),
            ("STOCKYARD_DATABASE_PATH", "/tmp/yard.db"),
            ("STOCKYARD_DB_MAX_CONNECTIONS", "12"),
            ("STOCKYARD_DB_BUSY_TIMEOUT_SECS", "9"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:9000");

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/yard.db"));
        assert_eq!(db.max_connections, 12);
        assert_eq!(db.busy_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_invalid_values_are_named() {
        let err = ApiConfig::from_lookup(lookup_from(&[("STOCKYARD_HTTP_PORT", "http")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for STOCKYARD_HTTP_PORT");

        let err = ApiConfig::from_lookup(lookup_from(&[("STOCKYARD_DB_MAX_CONNECTIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let config = ApiConfig::from_lookup(lookup_from(&[("STOCKYARD_BIND_ADDRESS", "not an ip")]))
            .unwrap();
        assert!(config.listen_addr().is_err());
    }
}
