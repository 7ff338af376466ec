//! Start-up glue: configuration, logging and serving.
//!
//! ```rust,no_run
//! use gantry::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = gantry::app::load_config(Some("gantry.toml".as_ref()))?;
//!     gantry::app::init_logging(&config)?;
//!
//!     let pipeline = Gantry::new()
//!         .config(gantry::server::PipelineConfigBuilder::from_web_config(&config).build())
//!         .routes(|mapper| mapper.get("/ping").handle(|| "pong"))
//!         .build()?;
//!
//!     gantry::app::serve(pipeline, &config).await
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use gantry_config::{ConfigLoader, GantryConfig};
use gantry_server::{Pipeline, Server, ServerConfig};
use gantry_telemetry::{LogConfig, TelemetryError};
use tracing::{info, warn};

/// Prefix of environment overrides, read as `GANTRY__SECTION__KEY`.
pub const ENV_PREFIX: &str = "GANTRY";

/// Loads defaults, then `path` if given, then `.env`, then `GANTRY__*`
/// environment variables, and validates the result.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GantryConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(path) = path {
        loader = loader
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }
    loader
        .with_dotenv()
        .context("failed to read .env")?
        .with_env_prefix(ENV_PREFIX)
        .load()
        .context("invalid configuration")
}

/// Installs the global subscriber described by the `[logging]` section.
///
/// An already installed subscriber is kept.
pub fn init_logging(config: &GantryConfig) -> anyhow::Result<()> {
    let log_config = LogConfig::from_logging_config(&config.logging);
    match gantry_telemetry::init_logging(&log_config) {
        Ok(()) => Ok(()),
        Err(TelemetryError::AlreadyInitialized(reason)) => {
            warn!(reason = %reason, "logging already initialised");
            Ok(())
        }
        Err(e) => Err(e).context("failed to initialise logging"),
    }
}

/// Serves `pipeline` with the `[server]` settings until SIGINT or SIGTERM.
pub async fn serve(pipeline: Pipeline, config: &GantryConfig) -> anyhow::Result<()> {
    let server_config = ServerConfig::from_server_config(&config.server);
    info!(
        addr = server_config.http_addr(),
        routes = pipeline.routes().len(),
        "starting server"
    );
    Server::new(server_config, pipeline)
        .run()
        .await
        .context("server failed")
}
