//! The dispatcher: the terminal link of the filter chain.
//!
//! One pass per request, no retries:
//!
//! 1. resolve the route (exact, then templated, then static resources)
//! 2. verify the method
//! 3. resolve and bind arguments
//! 4. run interceptor pre-hooks
//! 5. inject the transport parameters and invoke the handler
//! 6. resolve the return values
//! 7. run interceptor post-hooks
//! 8. write the payload or the error
//!
//! Failures in steps 1-3 are written immediately and no interceptor runs.

use std::sync::Arc;

use gantry_core::{HandlerError, RequestContext, ResponseWriter, RouteEntry};
use gantry_extract::{ArgumentResolver, ErrorResolver, Resolution, ResultResolver};
use gantry_middleware::{Completion, Dispatch, InterceptorRegister};
use gantry_router::RouteTable;
use http::StatusCode;
use tracing::{debug, error, warn};

use crate::pipeline_config::PipelineConfig;

/// Routes a filtered request to its handler and writes the outcome.
pub struct Dispatcher {
    routes: Arc<RouteTable<RouteEntry>>,
    interceptors: Arc<InterceptorRegister>,
    config: PipelineConfig,
}

impl Dispatcher {
    /// Creates a dispatcher over a finished route table.
    pub fn new(
        routes: Arc<RouteTable<RouteEntry>>,
        interceptors: Arc<InterceptorRegister>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            routes,
            interceptors,
            config,
        }
    }

    /// The route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable<RouteEntry> {
        &self.routes
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn argument_resolver(&self) -> &dyn ArgumentResolver {
        self.config.argument_resolver().as_ref()
    }

    fn result_resolver(&self) -> &dyn ResultResolver {
        self.config.result_resolver().as_ref()
    }

    fn error_resolver(&self) -> &dyn ErrorResolver {
        self.config.error_resolver().as_ref()
    }

    fn no_route(&self, request: &RequestContext, response: &ResponseWriter) {
        if let Some(resources) = self.config.static_resources() {
            match resources.serve(request, response) {
                Ok(()) => return,
                Err(err) if err.is_miss() => {
                    debug!(path = request.path(), reason = %err, "no static resource");
                }
                Err(err) => {
                    error!(path = request.path(), error = %err, "failed to serve static resource");
                    self.respond(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STATIC_RESOURCE_ERROR",
                        "failed to read static resource",
                        request,
                        response,
                    );
                    return;
                }
            }
        }

        if let Some(handler) = self.config.not_found() {
            handler(response, request);
            return;
        }
        self.respond(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            &format!("No route for [{}]", request.normalized_path()),
            request,
            response,
        );
    }

    fn method_not_allowed(&self, route: &RouteEntry, request: &RequestContext, response: &ResponseWriter) {
        let effective = route.methods().effective();
        let allow: Vec<&str> = effective.iter().map(http::Method::as_str).collect();
        response.insert_header(http::header::ALLOW.as_str(), &allow.join(", "));

        if let Some(handler) = self.config.method_not_allowed() {
            handler(response, request);
            return;
        }
        self.respond(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            &format!("Unsupported http method [{}].", request.method()),
            request,
            response,
        );
    }

    fn respond(
        &self,
        status: StatusCode,
        code: &str,
        message: &str,
        request: &RequestContext,
        response: &ResponseWriter,
    ) {
        match self.config.status_handler(status) {
            Some(handler) => handler(response, request),
            None => self.error_resolver().resolve(status, code, message, response),
        }
    }

    fn fail(&self, err: &HandlerError, request: &RequestContext, response: &ResponseWriter) {
        match self.config.status_handler(err.status_code()) {
            Some(handler) => handler(response, request),
            None => self.error_resolver().resolve_handler(err, response),
        }
    }
}

impl Dispatch for Dispatcher {
    fn dispatch(&self, mut request: RequestContext, response: &ResponseWriter) {
        let path = request.normalized_path();
        let Some(hit) = self.routes.find(&path) else {
            debug!(path = %path, "no route matched");
            self.no_route(&request, response);
            return;
        };
        let route = hit.value();
        let templated = hit.templated;

        if !route.methods().contains(request.method()) {
            warn!(
                path = %path,
                method = %request.method(),
                allowed = %route.methods(),
                "method not allowed"
            );
            self.method_not_allowed(route, &request, response);
            return;
        }

        let bound = self
            .argument_resolver()
            .resolve(route, &request, templated)
            .and_then(|arguments| {
                route
                    .plan()
                    .bind(arguments, route.params(), self.config.lenient_body_decoding())
            });
        let bound = match bound {
            Ok(bound) => bound,
            Err(err) => {
                warn!(
                    route.path = route.path(),
                    error = %err,
                    status = err.status_code().as_u16(),
                    "request rejected during argument resolution"
                );
                match self.config.status_handler(err.status_code()) {
                    Some(handler) => handler(response, &request),
                    None => self.error_resolver().resolve_extraction(&err, response),
                }
                return;
            }
        };

        let outcome = self.interceptors.iterate_pre(&mut request, response, route);
        if !outcome.passed() {
            debug!(route.path = route.path(), "handler skipped by interceptor");
            self.interceptors.iterate_post(
                &outcome,
                &request,
                response,
                route,
                &Completion::rejected(),
            );
            return;
        }

        let arguments = route.plan().assemble(bound, &request, response);
        debug!(
            route.path = route.path(),
            handler = route.handler().name(),
            templated,
            "invoking handler"
        );
        let resolved = match route.handler().invoke(arguments) {
            Ok(returns) => self.result_resolver().resolve(route, returns),
            Err(err) => {
                error!(route.path = route.path(), handler = route.handler().name(), error = %err, "handler invocation failed");
                Err(HandlerError::new(err.to_string()).with_code("INVOKE_ERROR"))
            }
        };

        let completion = match &resolved {
            Ok(resolution) => Completion::invoked(resolution.payload(), None),
            Err(err) => Completion::invoked(None, Some(err)),
        };
        self.interceptors
            .iterate_post(&outcome, &request, response, route, &completion);

        match resolved {
            Ok(Resolution::Empty) => {}
            Ok(Resolution::Payload(payload)) => {
                if let Err(err) = self.result_resolver().write(payload.as_ref(), response) {
                    error!(route.path = route.path(), error = %err, "failed to write response");
                    self.fail(&err, &request, response);
                }
            }
            Err(err) => {
                if err.status_code().is_server_error() {
                    error!(route.path = route.path(), code = err.error_code(), error = %err.message(), "handler failed");
                } else {
                    debug!(route.path = route.path(), code = err.error_code(), "handler returned an error");
                }
                self.fail(&err, &request, response);
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("interceptors", &self.interceptors.len())
            .field("config", &self.config)
            .finish()
    }
}
