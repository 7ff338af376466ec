//! Application assembly.
//!
//! [`Gantry`] collects controllers, filters, interceptors and configuration,
//! then [`Gantry::build`] validates every route and produces an immutable
//! [`Pipeline`] that is shared by all requests.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use gantry_core::{RegistrationError, RequestContext, RequestId, ResponseWriter, RouteEntry};
use gantry_middleware::{Dispatch, Filter, FilterChain, Interceptor, InterceptorRegister};
use gantry_router::RouteTable;
use http_body_util::Full;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::mapper::{Controller, Mapper};
use crate::pipeline_config::PipelineConfig;

/// Header carrying the request id on requests and responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

type RouteFn = Box<dyn FnOnce(&mut Mapper) + Send>;

/// Filters collected before the chain exists.
#[derive(Default)]
pub struct FilterRegistry {
    filters: Vec<(String, Arc<dyn Filter>)>,
    excludes: Vec<String>,
}

impl FilterRegistry {
    /// Adds a filter applied to paths matching `rule`.
    pub fn add(&mut self, rule: &str, filter: Arc<dyn Filter>) -> &mut Self {
        self.filters.push((rule.to_string(), filter));
        self
    }

    /// Lets paths matching `rule` bypass every filter.
    pub fn exclude(&mut self, rule: &str) -> &mut Self {
        self.excludes.push(rule.to_string());
        self
    }

    /// Number of filters added.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if no filter was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<&str> = self.filters.iter().map(|(rule, _)| rule.as_str()).collect();
        f.debug_struct("FilterRegistry")
            .field("filters", &rules)
            .field("excludes", &self.excludes)
            .finish()
    }
}

/// Hook for modules that contribute filters and interceptors.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use gantry_middleware::CorsFilter;
/// use gantry_server::{FilterRegistry, WebConfigurer};
///
/// struct Cors;
///
/// impl WebConfigurer for Cors {
///     fn add_filters(&self, filters: &mut FilterRegistry) {
///         filters.add("/", Arc::new(CorsFilter::builder().build()));
///     }
/// }
/// ```
pub trait WebConfigurer: Send + Sync {
    /// Adds filters.
    fn add_filters(&self, filters: &mut FilterRegistry) {
        let _ = filters;
    }

    /// Adds interceptors.
    fn add_interceptors(&self, interceptors: &mut InterceptorRegister) {
        let _ = interceptors;
    }
}

/// Builder for a [`Pipeline`].
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use gantry_server::{Gantry, PipelineConfig};
///
/// let pipeline = Gantry::new()
///     .config(PipelineConfig::builder().context_path("/api").build())
///     .routes(|mapper| {
///         mapper.get("/hello").param("name").handle(|name: String| format!("hello {name}"));
///     })
///     .build()
///     .unwrap();
///
/// let request = http::Request::get("/api/hello?name=gantry").body(Bytes::new()).unwrap();
/// let response = pipeline.handle(request);
/// assert_eq!(response.status(), 200);
/// ```
#[must_use]
#[derive(Default)]
pub struct Gantry {
    config: PipelineConfig,
    controllers: Vec<Box<dyn Controller>>,
    routes: Vec<RouteFn>,
    filters: FilterRegistry,
    interceptors: InterceptorRegister,
    configurers: Vec<Box<dyn WebConfigurer>>,
}

impl Gantry {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a controller.
    pub fn controller(mut self, controller: impl Controller + 'static) -> Self {
        self.controllers.push(Box::new(controller));
        self
    }

    /// Adds routes outside any controller.
    pub fn routes<F>(mut self, routes: F) -> Self
    where
        F: FnOnce(&mut Mapper) + Send + 'static,
    {
        self.routes.push(Box::new(routes));
        self
    }

    /// Adds a filter applied to paths matching `rule`.
    pub fn filter(mut self, rule: &str, filter: Arc<dyn Filter>) -> Self {
        self.filters.add(rule, filter);
        self
    }

    /// Lets paths matching `rule` bypass every filter.
    pub fn exclude_filter(mut self, rule: &str) -> Self {
        self.filters.exclude(rule);
        self
    }

    /// Adds an interceptor applied to paths matching `rule`.
    pub fn interceptor(mut self, rule: &str, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(rule, interceptor);
        self
    }

    /// Lets paths matching `rule` bypass every interceptor.
    pub fn exclude_interceptor(mut self, rule: &str) -> Self {
        self.interceptors.push_exclude(rule);
        self
    }

    /// Adds a configurer, applied at build time after directly added
    /// filters and interceptors.
    pub fn configure(mut self, configurer: impl WebConfigurer + 'static) -> Self {
        self.configurers.push(Box::new(configurer));
        self
    }

    /// Validates and registers every route, then assembles the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`]; the application must not
    /// start with an invalid route.
    pub fn build(self) -> Result<Pipeline, RegistrationError> {
        let Self {
            config,
            controllers,
            routes,
            mut filters,
            mut interceptors,
            configurers,
        } = self;

        let mut table = RouteTable::new();
        for controller in &controllers {
            let mut mapper = Mapper::new(config.context_path(), controller.base_path());
            controller.mapping(&mut mapper);
            register_routes(&mut table, mapper)?;
        }
        for add_routes in routes {
            let mut mapper = Mapper::new(config.context_path(), "");
            add_routes(&mut mapper);
            register_routes(&mut table, mapper)?;
        }

        for configurer in &configurers {
            configurer.add_filters(&mut filters);
            configurer.add_interceptors(&mut interceptors);
        }

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(table),
            Arc::new(interceptors),
            config,
        ));
        let mut chain = FilterChain::new(Arc::clone(&dispatcher) as Arc<dyn Dispatch>);
        for (rule, filter) in filters.filters {
            chain.push(&rule, filter);
        }
        for rule in &filters.excludes {
            chain.push_exclude(rule);
        }

        info!(
            routes = dispatcher.routes().len(),
            filters = chain.len(),
            "pipeline assembled"
        );
        Ok(Pipeline {
            chain: Arc::new(chain),
            dispatcher,
        })
    }
}

impl fmt::Debug for Gantry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gantry")
            .field("config", &self.config)
            .field("controllers", &self.controllers.len())
            .field("filters", &self.filters)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

fn register_routes(
    table: &mut RouteTable<RouteEntry>,
    mapper: Mapper,
) -> Result<(), RegistrationError> {
    for entry in mapper.into_routes() {
        let entry = entry?;
        let path = entry.path().to_string();
        let name = entry.handler().name().to_string();
        let methods = entry.methods().to_string();
        if table.register(&path, entry)?.is_some() {
            debug!(path = %path, "route re-registered, previous entry replaced");
        }
        info!("Mapped [{path} --> {name}] with http method {methods}");
    }
    Ok(())
}

/// An assembled, immutable request pipeline.
///
/// Cheap to clone; clones share routes, filters and configuration.
#[derive(Clone)]
pub struct Pipeline {
    chain: Arc<FilterChain>,
    dispatcher: Arc<Dispatcher>,
}

impl Pipeline {
    /// Runs a fully buffered HTTP request through the pipeline.
    pub fn handle(&self, request: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let inbound = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        let mut context = RequestContext::from_request(request);
        if let Some(id) = inbound {
            context = context.with_request_id(RequestId::from(id));
        }
        self.handle_context(context).into_response()
    }

    /// Runs a request context through the pipeline and returns the
    /// response it produced.
    pub fn handle_context(&self, request: RequestContext) -> ResponseWriter {
        let request_id = request.request_id();
        let span = info_span!(
            "request",
            request_id = %request_id,
            http.method = %request.method(),
            http.path = request.path(),
        );
        let _guard = span.enter();

        let started = std::time::Instant::now();
        let response = ResponseWriter::new();
        response.insert_header(REQUEST_ID_HEADER, &request_id.to_string());
        self.chain.run(request, &response);

        debug!(
            http.status_code = response.status().as_u16(),
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request completed"
        );
        response
    }

    /// The registered routes.
    #[must_use]
    pub fn routes(&self) -> &RouteTable<RouteEntry> {
        self.dispatcher.routes()
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        self.dispatcher.config()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("chain", &self.chain)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::HandlerError;
    use gantry_middleware::FnFilter;
    use http::{Method, StatusCode};
    use parking_lot::Mutex;

    fn request(method: Method, uri: &str) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    struct Greeter;

    impl Controller for Greeter {
        fn base_path(&self) -> &str {
            "/greet"
        }

        fn mapping(&self, mapper: &mut Mapper) {
            mapper.get("/{name}").path_variable("name").handle(|name: String| format!("hi {name}"));
        }
    }

    #[test]
    fn test_controller_under_context_path() {
        let pipeline = Gantry::new()
            .config(PipelineConfig::builder().context_path("/app").build())
            .controller(Greeter)
            .build()
            .unwrap();
        assert!(pipeline.routes().lookup("/app/greet/{name}").is_some());

        let response = pipeline.handle(request(Method::GET, "/app/greet/bob"));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_request_id_echoed() {
        let pipeline = Gantry::new().controller(Greeter).build().unwrap();
        let id = Uuid::now_v7();
        let mut req = request(Method::GET, "/greet/x");
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, id.to_string().parse().unwrap());
        let response = pipeline.handle(req);
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            id.to_string().as_str()
        );

        let response = pipeline.handle(request(Method::GET, "/greet/y"));
        let generated = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(generated.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_invalid_inbound_request_id_replaced() {
        let pipeline = Gantry::new().controller(Greeter).build().unwrap();
        let mut req = request(Method::GET, "/greet/x");
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, "not-a-uuid".parse().unwrap());
        let response = pipeline.handle(req);
        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert_ne!(id, "not-a-uuid");
    }

    #[test]
    fn test_registration_error_aborts_build() {
        let result = Gantry::new()
            .routes(|mapper| {
                mapper.get("/bad").handle(|_a: String, _b: String| ());
            })
            .build();
        assert!(matches!(result, Err(RegistrationError::ArityMismatch { .. })));

        let result = Gantry::new()
            .routes(|mapper| mapper.get("/bad/{").handle(|| ()))
            .build();
        assert!(matches!(result, Err(RegistrationError::InvalidPath(_))));

        let result = Gantry::new()
            .routes(|mapper| {
                mapper
                    .get("/w")
                    .handle(|writer: Option<ResponseWriter>| writer.is_some());
            })
            .build();
        assert!(matches!(
            result,
            Err(RegistrationError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_configurer_and_filters() {
        struct Tagging {
            log: Arc<Mutex<Vec<&'static str>>>,
        }

        impl WebConfigurer for Tagging {
            fn add_filters(&self, filters: &mut FilterRegistry) {
                let log = Arc::clone(&self.log);
                filters.add(
                    "/",
                    Arc::new(FnFilter::new("tag", move |request, response, next| {
                        log.lock().push("configured");
                        next.run(request, response);
                    })),
                );
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let direct = Arc::clone(&log);
        let pipeline = Gantry::new()
            .filter(
                "/",
                Arc::new(FnFilter::new("direct", move |request, response, next| {
                    direct.lock().push("direct");
                    next.run(request, response);
                })),
            )
            .exclude_filter("/greet/skip")
            .configure(Tagging { log: Arc::clone(&log) })
            .controller(Greeter)
            .build()
            .unwrap();

        pipeline.handle(request(Method::GET, "/greet/a"));
        assert_eq!(*log.lock(), vec!["direct", "configured"]);

        pipeline.handle(request(Method::GET, "/greet/skip"));
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_handler_error_response() {
        let pipeline = Gantry::new()
            .routes(|mapper| {
                mapper.post("/orders").handle(|| -> Result<(), HandlerError> {
                    Err(HandlerError::bad_request("empty order"))
                });
            })
            .build()
            .unwrap();
        let response = pipeline.handle(request(Method::POST, "/orders"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
