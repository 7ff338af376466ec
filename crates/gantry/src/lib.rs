//! # Gantry
//!
//! An in-process MVC routing and dispatch engine.
//!
//! Handlers are plain functions. Each route declares where every argument
//! comes from (query or form, header, path variable, JSON body, uploaded
//! file, or a value object bound field by field) and Gantry validates the
//! declaration against the handler signature once, at start-up.
//!
//! ```text
//! Request → Filter Chain → Dispatcher ─ route lookup (exact, template, static files)
//!                                     ─ method check                  → 404 / 405
//!                                     ─ argument resolution           → 400
//!                                     ─ interceptor pre-hooks         → short-circuit
//!                                     ─ handler
//!                                     ─ result resolution
//!                                     ─ interceptor post-hooks (reverse)
//! Response ←──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use gantry::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct NewUser {
//!     name: String,
//! }
//!
//! struct Users;
//!
//! impl Controller for Users {
//!     fn base_path(&self) -> &str {
//!         "/users"
//!     }
//!
//!     fn mapping(&self, mapper: &mut Mapper) {
//!         mapper
//!             .get("/{id}")
//!             .path_variable("id")
//!             .handle(|id: u64| -> Result<String, HandlerError> {
//!                 if id == 0 {
//!                     return Err(HandlerError::not_found("no such user"));
//!                 }
//!                 Ok(format!("user {id}"))
//!             });
//!
//!         mapper
//!             .post("")
//!             .body("user")
//!             .handle(|user: Body<NewUser>| user.into_inner().name);
//!     }
//! }
//!
//! let pipeline = Gantry::new()
//!     .config(PipelineConfig::builder().context_path("/api").build())
//!     .controller(Users)
//!     .build()
//!     .unwrap();
//!
//! assert!(pipeline.routes().lookup("/api/users/{id}").is_some());
//! ```
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`router`] | path templates, route table, method sets |
//! | [`core`] | request, response, descriptors, handlers, errors |
//! | [`middleware`] | filter chain, interceptors, CORS |
//! | [`extract`] | argument, result and error resolvers |
//! | [`server`] | assembly, dispatcher, static files, HTTP transport |
//! | [`config`] | layered configuration |
//! | [`telemetry`] | logging initialisation |

#![doc(html_root_url = "https://docs.rs/gantry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use gantry_config as config;
pub use gantry_core as core;
pub use gantry_extract as extract;
pub use gantry_middleware as middleware;
pub use gantry_router as router;
pub use gantry_server as server;
pub use gantry_telemetry as telemetry;

pub mod app;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use gantry_core::{
        Bind, Body, FieldDescriptor, HandlerError, Json, MultipartFile, ParamDescriptor,
        RequestContext, RequestId, ResponseWriter, RouteEntry, ValueObject,
    };

    pub use gantry_middleware::{
        Completion, CorsFilter, Filter, FnFilter, Interceptor, InterceptorRegister, Next,
        PathRule,
    };

    pub use gantry_extract::{ArgumentResolver, ErrorResolver, ResultResolver};

    pub use gantry_server::{
        Controller, FilterRegistry, Gantry, Mapper, Mapping, Pipeline, PipelineConfig, Server,
        ServerConfig, ShutdownSignal, StaticResources, WebConfigurer,
    };

    pub use gantry_config::{ConfigLoader, GantryConfig};
}
