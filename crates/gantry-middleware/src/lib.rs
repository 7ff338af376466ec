//! # Gantry Middleware
//!
//! The two layers of request processing that surround a handler.
//!
//! ```text
//! Request → Filter Chain → Dispatcher → bind → pre-hooks → Handler
//!                                                              ↓
//! Response ←──────────────── post-hooks (reverse) ←────────────┘
//! ```
//!
//! - [`FilterChain`]: path-scoped filters that run before routing. A filter
//!   continues the chain through [`Next`] or ends the request by not
//!   calling it.
//! - [`InterceptorRegister`]: path-scoped pre/post hooks that run after
//!   routing. Every interceptor whose pre-hook ran gets its post-hook, in
//!   reverse order.
//!
//! Both layers scope their members with a [`PathRule`] (`/` for everything,
//! `/prefix/*`, or an exact path) and both support excluding paths.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gantry_core::{RequestContext, ResponseWriter};
//! use gantry_middleware::{Dispatch, FilterChain, FnFilter};
//! use http::Method;
//!
//! let dispatcher: Arc<dyn Dispatch> = Arc::new(|_: RequestContext, response: &ResponseWriter| {
//!     response.write(b"hello");
//! });
//! let chain = FilterChain::new(dispatcher)
//!     .filter("/api/*", Arc::new(FnFilter::new("tag", |request, response, next| {
//!         response.insert_header("x-api", "1");
//!         next.run(request, response);
//!     })))
//!     .exclude("/health");
//!
//! let response = ResponseWriter::new();
//! chain.run(RequestContext::new(Method::GET, "/api/users".parse().unwrap()), &response);
//! assert_eq!(response.header("x-api").as_deref(), Some("1"));
//! assert_eq!(response.body().as_ref(), b"hello");
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod filter;
pub mod interceptor;
pub mod path_rule;
pub mod stages;

pub use filter::{Dispatch, Filter, FilterChain, FnFilter, Next, CURSOR_ATTRIBUTE};
pub use interceptor::{Completion, Interceptor, InterceptorRegister, PreOutcome};
pub use path_rule::{ExcludeSet, PathRule};
pub use stages::{AllowedOrigins, CorsBuilder, CorsConfig, CorsFilter};
