//! Structured logging for Gantry applications.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! a JSON or a human-readable formatter. `RUST_LOG` takes precedence over
//! the configured level when it is set.
//!
//! # Example
//!
//! ```rust,no_run
//! use gantry_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development().service_name("orders")).unwrap();
//! tracing::info!(http.path = "/orders", "ready");
//! ```
//!
//! [`EnvFilter`]: tracing_subscriber::EnvFilter

#![doc(html_root_url = "https://docs.rs/gantry-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
