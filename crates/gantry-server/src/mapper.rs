//! Controller and route registration.
//!
//! A [`Controller`] groups routes under a base path. During assembly each
//! controller receives a [`Mapper`] and describes its routes with
//! [`Mapping`] builders:
//!
//! ```rust
//! use gantry_core::HandlerError;
//! use gantry_server::{Controller, Mapper};
//! use http::Method;
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
//!             .handle(|id: u64| -> Result<String, HandlerError> { Ok(format!("user {id}")) });
//!
//!         mapper
//!             .request("/search")
//!             .method(Method::GET)
//!             .method(Method::POST)
//!             .param("q")
//!             .param_optional("limit")
//!             .handle(|q: String, limit: Option<u32>| format!("{q}:{limit:?}"));
//!     }
//! }
//!
//! let mut mapper = Mapper::new("/api", Users.base_path());
//! Users.mapping(&mut mapper);
//! let routes = mapper.into_routes();
//! assert_eq!(routes.len(), 2);
//! assert_eq!(routes[0].as_ref().unwrap().path(), "/api/users/{id}");
//! ```

use std::sync::Arc;

use gantry_core::{
    BoxedHandler, Callable, Handler, MethodSet, ParamDescriptor, RegistrationError, RouteEntry,
};
use gantry_router::join_paths;
use http::Method;

/// A group of routes sharing a base path.
pub trait Controller: Send + Sync {
    /// Path prepended to every route of this controller.
    fn base_path(&self) -> &str {
        ""
    }

    /// Registers the controller's routes.
    fn mapping(&self, mapper: &mut Mapper);
}

/// Collects the routes of one controller.
#[derive(Debug)]
pub struct Mapper {
    context_path: String,
    base_path: String,
    routes: Vec<Result<RouteEntry, RegistrationError>>,
}

impl Mapper {
    /// Creates a mapper whose routes live under `context_path` and
    /// `base_path`.
    #[must_use]
    pub fn new(context_path: &str, base_path: &str) -> Self {
        Self {
            context_path: context_path.to_string(),
            base_path: base_path.to_string(),
            routes: Vec::new(),
        }
    }

    /// Starts a mapping with no method declared (accepts `GET` only).
    pub fn request(&mut self, path: &str) -> Mapping<'_> {
        let full = join_paths(&[&self.context_path, &self.base_path, path]);
        Mapping {
            mapper: self,
            path: full,
            methods: MethodSet::new(),
            params: Vec::new(),
            name: None,
        }
    }

    /// Starts a `GET` mapping.
    pub fn get(&mut self, path: &str) -> Mapping<'_> {
        self.request(path).method(Method::GET)
    }

    /// Starts a `POST` mapping.
    pub fn post(&mut self, path: &str) -> Mapping<'_> {
        self.request(path).method(Method::POST)
    }

    /// Starts a `PUT` mapping.
    pub fn put(&mut self, path: &str) -> Mapping<'_> {
        self.request(path).method(Method::PUT)
    }

    /// Starts a `DELETE` mapping.
    pub fn delete(&mut self, path: &str) -> Mapping<'_> {
        self.request(path).method(Method::DELETE)
    }

    /// Starts a `PATCH` mapping.
    pub fn patch(&mut self, path: &str) -> Mapping<'_> {
        self.request(path).method(Method::PATCH)
    }

    /// Number of mappings finished so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no mapping was finished.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The finished routes in registration order. Invalid registrations are
    /// kept as errors so assembly can report them.
    #[must_use]
    pub fn into_routes(self) -> Vec<Result<RouteEntry, RegistrationError>> {
        self.routes
    }
}

/// Builder for one route. Finished by [`Mapping::handle`].
///
/// Descriptors are positional: the n-th descriptor feeds the n-th handler
/// parameter that is neither a [`RequestContext`](gantry_core::RequestContext)
/// nor a [`ResponseWriter`](gantry_core::ResponseWriter).
#[must_use = "a mapping does nothing until `handle` is called"]
#[derive(Debug)]
pub struct Mapping<'m> {
    mapper: &'m mut Mapper,
    path: String,
    methods: MethodSet,
    params: Vec<ParamDescriptor>,
    name: Option<String>,
}

impl Mapping<'_> {
    /// Adds an accepted method.
    pub fn method(mut self, method: Method) -> Self {
        self.methods.insert(method);
        self
    }

    /// Names the handler in logs. Defaults to its type name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a descriptor built by hand.
    pub fn descriptor(mut self, descriptor: ParamDescriptor) -> Self {
        self.params.push(descriptor);
        self
    }

    /// A required query or form parameter.
    pub fn param(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::param(name))
    }

    /// An optional query or form parameter.
    pub fn param_optional(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::param(name).optional())
    }

    /// A required header.
    pub fn header(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::header(name))
    }

    /// An optional header.
    pub fn header_optional(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::header(name).optional())
    }

    /// A variable of the path template.
    pub fn path_variable(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::path_variable(name))
    }

    /// A required JSON body.
    pub fn body(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::body(name))
    }

    /// An optional JSON body.
    pub fn body_optional(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::body(name).optional())
    }

    /// A required uploaded file.
    pub fn file(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::file(name))
    }

    /// An optional uploaded file.
    pub fn file_optional(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::file(name).optional())
    }

    /// A value object bound field by field.
    pub fn value_object(self, name: &str) -> Self {
        self.descriptor(ParamDescriptor::value_object(name))
    }

    /// Finishes the mapping with `handler`.
    pub fn handle<H, Args>(self, handler: H)
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let handler: Arc<dyn Callable> = match self.name {
            Some(name) => Arc::new(BoxedHandler::named(handler, name)),
            None => Arc::new(BoxedHandler::new(handler)),
        };
        let entry = RouteEntry::new(self.path, handler, self.methods, self.params);
        self.mapper.routes.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{Body, ParamSource, RequestContext, ResponseWriter};
    use serde::Deserialize;

    fn routes(context: &str, base: &str, f: impl FnOnce(&mut Mapper)) -> Vec<RouteEntry> {
        let mut mapper = Mapper::new(context, base);
        f(&mut mapper);
        mapper.into_routes().into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn test_full_path_joined_and_normalized() {
        let entries = routes("/api/", "//users/", |m| m.get("/list/").handle(|| "ok"));
        assert_eq!(entries[0].path(), "/api/users/list");

        let entries = routes("", "", |m| m.get("").handle(|| "root"));
        assert_eq!(entries[0].path(), "/");
    }

    #[test]
    fn test_methods() {
        let entries = routes("", "", |m| {
            m.request("/any").handle(|| ());
            m.post("/form").method(Method::PUT).handle(|| ());
            m.delete("/gone").handle(|| ());
            m.patch("/tweak").handle(|| ());
        });
        assert!(entries[0].methods().is_defaulted());
        assert!(entries[0].methods().contains(&Method::GET));
        assert_eq!(entries[1].methods().to_string(), "[POST, PUT]");
        assert!(entries[2].methods().contains(&Method::DELETE));
        assert!(entries[3].methods().contains(&Method::PATCH));
    }

    #[test]
    fn test_descriptors_in_order() {
        #[derive(Deserialize)]
        struct Payload {
            _name: String,
        }

        let entries = routes("", "/items", |m| {
            m.post("/{id}")
                .path_variable("id")
                .header_optional("X-Trace")
                .body("payload")
                .handle(
                    |_: ResponseWriter, _id: u32, _trace: Option<String>, _body: Body<Payload>| (),
                );
        });
        let params = entries[0].params();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].source(), ParamSource::PathVariable);
        assert_eq!(params[1].source(), ParamSource::Header);
        assert!(!params[1].is_required());
        assert_eq!(params[2].source(), ParamSource::Body);
        assert!(params[2].is_required());
    }

    #[test]
    fn test_handler_name() {
        let entries = routes("", "", |m| {
            m.get("/named").name("users::list").handle(|_: RequestContext| ());
        });
        assert_eq!(entries[0].handler().name(), "users::list");
    }

    #[test]
    fn test_arity_mismatch_is_kept_as_error() {
        let mut mapper = Mapper::new("", "");
        mapper.get("/bad").param("a").param("b").handle(|_a: String| ());
        let routes = mapper.into_routes();
        assert!(matches!(
            routes[0],
            Err(RegistrationError::ArityMismatch { expected: 1, registered: 2, .. })
        ));
    }

    #[test]
    fn test_controller() {
        struct Health;

        impl Controller for Health {
            fn mapping(&self, mapper: &mut Mapper) {
                mapper.get("/health").handle(|| "up");
            }
        }

        let mut mapper = Mapper::new("/svc", Health.base_path());
        Health.mapping(&mut mapper);
        assert_eq!(mapper.len(), 1);
        assert_eq!(mapper.into_routes()[0].as_ref().unwrap().path(), "/svc/health");
    }
}
