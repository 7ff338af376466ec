//! # Gantry Core
//!
//! Core types for the Gantry request pipeline.
//!
//! - [`RequestContext`]: the buffered request with its attribute bag
//! - [`ResponseWriter`]: the shared, buffered response sink
//! - [`ParamDescriptor`]: where each handler argument comes from
//! - [`Handler`] / [`Callable`]: typed handlers and their erased form
//! - [`RouteEntry`] / [`BindingPlan`]: a registered route and its cached
//!   parameter binders
//! - [`ExtractionError`], [`HandlerError`], [`RegistrationError`]: the error
//!   taxonomy

#![doc(html_root_url = "https://docs.rs/gantry-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod descriptor;
mod error;
mod fields;
mod handler;
mod response;
mod route;
mod upload;

pub use context::{RequestContext, RequestId};
pub use descriptor::{FieldDescriptor, ParamDescriptor, ParamSource, ValueObject};
pub use error::{
    ErrorDetail, ErrorEnvelope, ExtractionError, ExtractionErrorKind, ExtractionSource,
    HandlerError, InvokeError, RegistrationError,
};
pub use handler::{
    Argument, Bind, Binder, Body, BoxedArg, BoxedHandler, Callable, Handler, HandlerParam,
    IntoReturns, Json, ParamSpec, ReturnValue, Returns, Shape, Slot,
};
pub use response::{ResponseWriter, JSON_CONTENT_TYPE};
pub use route::{BindingPlan, RouteEntry};
pub use upload::MultipartFile;

pub use gantry_router::{MethodSet, PathPattern};
