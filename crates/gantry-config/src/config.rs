//! The top-level [`GantryConfig`].

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::schema::LOG_LEVELS;
use crate::{ConfigError, LogFormat, LoggingConfig, ServerConfig, WebConfig};

/// Complete application configuration.
///
/// # Example
///
/// ```
/// use gantry_config::GantryConfig;
///
/// let config: GantryConfig = toml::from_str(
///     r#"
///     [server]
///     http_addr = "127.0.0.1:9000"
///
///     [web]
///     context_path = "/api"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.web.context_path, "/api");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GantryConfig {
    /// Transport settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Routing and binding settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GantryConfig {
    /// Checks values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                "bind address must not be empty",
            ));
        }
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        let context_path = &self.web.context_path;
        if !context_path.is_empty() && !context_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "web.context_path",
                format!("must start with '/': {context_path}"),
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("unknown level '{}', expected one of {LOG_LEVELS:?}", self.logging.level),
            ));
        }

        Ok(())
    }

    /// Verbose, human-readable logging.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi = true;
        config
    }

    /// JSON logging at `info`.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi = false;
        config
    }
}
