//! Errors raised while assembling a [`GantryConfig`](crate::GantryConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration layer could not be applied or the merged result was
/// rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file layer points at nothing.
    #[error("no configuration at {path}")]
    MissingFile {
        /// The requested path.
        path: PathBuf,
    },

    /// A file layer exists but its bytes could not be read.
    #[error("cannot read configuration from {path}")]
    Unreadable {
        /// The file being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Only `toml` and `json` layers are understood.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A TOML layer is malformed or names an unknown key.
    #[error("bad TOML layer: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON layer is malformed or names an unknown key.
    #[error("bad JSON layer: {0}")]
    Json(#[from] serde_json::Error),

    /// The merged configuration holds a value gantry cannot run with.
    #[error("{key} {reason}")]
    InvalidValue {
        /// Dotted key, such as `server.max_body_bytes`.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override does not fit the key it targets.
    #[error("environment override {var} rejected: {reason}")]
    BadOverride {
        /// Full variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `.env` was found but is malformed.
    #[error(".env could not be applied: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub(crate) fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
