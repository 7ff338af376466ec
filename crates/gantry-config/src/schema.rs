//! Configuration schema types.
//!
//! Every section rejects unknown fields and falls back to defaults for
//! fields it does not mention.

use serde::{Deserialize, Serialize};

/// Default multipart and body cap, 32 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 << 20;

/// HTTP transport settings.
///
/// # Example
///
/// ```
/// use gantry_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Time allowed for reading a request body, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_request_timeout() -> u64 {
    30000
}

/// Routing and binding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebConfig {
    /// Prefix applied to every registered route, e.g. `/api`.
    #[serde(default)]
    pub context_path: String,

    /// Directory served for paths no route matches.
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Log and skip undecodable request bodies instead of answering 400.
    #[serde(default)]
    pub lenient_body_decoding: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit ANSI colour codes.
    #[serde(default)]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            ansi: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Levels accepted by [`LoggingConfig::level`].
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.max_body_bytes, 32 * 1024 * 1024);
        assert_eq!(config.request_timeout_ms, 30000);
    }

    #[test]
    fn test_web_partial_toml() {
        let web: WebConfig = toml::from_str(r#"context_path = "/api""#).unwrap();
        assert_eq!(web.context_path, "/api");
        assert!(web.static_dir.is_none());
        assert!(!web.lenient_body_decoding);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<WebConfig, _> = toml::from_str("context = \"/api\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_lowercase() {
        let logging: LoggingConfig = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(logging.format, LogFormat::Pretty);
        assert_eq!(logging.level, "info");
    }
}
