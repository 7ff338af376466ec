//! # Gantry Extract
//!
//! The three pluggable resolvers of the Gantry request pipeline.
//!
//! | Resolver | Default | Role |
//! |---|---|---|
//! | [`ArgumentResolver`] | [`DefaultArgumentResolver`] | reads one raw value per parameter descriptor |
//! | [`ResultResolver`] | [`JsonResultResolver`] | interprets handler return values and writes the payload |
//! | [`ErrorResolver`] | [`JsonErrorResolver`] | writes failures as a JSON error envelope |
//!
//! Form bodies and `multipart/form-data` uploads are decoded by the
//! [`form`] and [`multipart`] modules. Both operate on the buffered body,
//! which stays readable for later consumers.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gantry_core::{BoxedHandler, Callable, MethodSet, ParamDescriptor, RequestContext, RouteEntry};
//! use gantry_extract::{ArgumentResolver, DefaultArgumentResolver};
//! use http::Method;
//!
//! let handler: Arc<dyn Callable> = Arc::new(BoxedHandler::new(|id: u64| id));
//! let route = RouteEntry::new(
//!     "/users/{id}",
//!     handler,
//!     MethodSet::new(),
//!     vec![ParamDescriptor::path_variable("id")],
//! )
//! .unwrap();
//!
//! let request = RequestContext::new(Method::GET, "/users/7".parse().unwrap());
//! let args = DefaultArgumentResolver::new().resolve(&route, &request, true).unwrap();
//! assert_eq!(args.len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod form;
pub mod multipart;
pub mod resolver;
pub mod result;

pub use error::{ErrorResolver, JsonErrorResolver};
pub use multipart::{MultipartConfig, MultipartForm, DEFAULT_MAX_MEMORY};
pub use resolver::{ArgumentResolver, DefaultArgumentResolver};
pub use result::{JsonResultResolver, Resolution, ResultResolver};
