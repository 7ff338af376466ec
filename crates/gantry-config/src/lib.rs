//! Typed configuration for Gantry applications.
//!
//! [`GantryConfig`] has three sections:
//!
//! - [`ServerConfig`]: bind address, shutdown timeout, body cap
//! - [`WebConfig`]: context path, static directory, body decoding mode
//! - [`LoggingConfig`]: level, format, colours
//!
//! Unknown fields are rejected everywhere, so a typo fails at start-up
//! instead of being silently ignored.
//!
//! # Example
//!
//! ```no_run
//! use gantry_config::ConfigLoader;
//!
//! # fn main() -> Result<(), gantry_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("gantry.toml")?
//!     .with_env_prefix("GANTRY")
//!     .load()?;
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_body_bytes = 33554432
//! request_timeout_ms = 30000
//!
//! [web]
//! context_path = "/api"
//! static_dir = "./public"
//! lenient_body_decoding = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ansi = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Any value can be overridden with `PREFIX__SECTION__KEY`, for example
//! `GANTRY__SERVER__HTTP_ADDR=0.0.0.0:9000` or
//! `GANTRY__WEB__CONTEXT_PATH=/v2`.

#![doc(html_root_url = "https://docs.rs/gantry-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::GantryConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    LogFormat, LoggingConfig, ServerConfig, WebConfig, DEFAULT_MAX_BODY_BYTES, LOG_LEVELS,
};
