//! # Gantry Server
//!
//! Assembly, dispatch and transport for the Gantry request pipeline.
//!
//! - [`Gantry`]: collects controllers, filters, interceptors and
//!   [`PipelineConfig`], validates every route and builds a [`Pipeline`].
//! - [`Dispatcher`]: the end of the filter chain. Resolves the route,
//!   checks the method, binds arguments, runs interceptors, invokes the
//!   handler and writes the outcome.
//! - [`Controller`], [`Mapper`] and [`Mapping`]: the registration API.
//! - [`StaticResources`]: serves files for paths no route matches.
//! - [`Server`]: a hyper HTTP/1 adapter with graceful shutdown.
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use gantry_server::{Controller, Gantry, Mapper};
//!
//! struct Echo;
//!
//! impl Controller for Echo {
//!     fn base_path(&self) -> &str {
//!         "/echo"
//!     }
//!
//!     fn mapping(&self, mapper: &mut Mapper) {
//!         mapper.get("/{word}").path_variable("word").handle(|word: String| word);
//!     }
//! }
//!
//! let pipeline = Gantry::new().controller(Echo).build().unwrap();
//! let request = http::Request::get("/echo/hello").body(Bytes::new()).unwrap();
//! let response = pipeline.handle(request);
//! assert_eq!(response.status(), 200);
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod dispatcher;
mod mapper;
mod pipeline;
mod pipeline_config;
mod server;
mod shutdown;
mod static_files;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use dispatcher::Dispatcher;
pub use mapper::{Controller, Mapper, Mapping};
pub use pipeline::{FilterRegistry, Gantry, Pipeline, WebConfigurer, REQUEST_ID_HEADER};
pub use pipeline_config::{PipelineConfig, PipelineConfigBuilder, StatusHandler};
pub use server::{Server, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use static_files::{StaticFileError, StaticResources};
