//! Route-scoped hooks that run around handler invocation.
//!
//! Interceptors run after a route has been resolved and its arguments bound.
//! Pre-hooks run in registration order and may reject the request; post-hooks
//! run in reverse order for every interceptor whose pre-hook ran, including
//! the one that rejected.

use std::fmt;
use std::sync::Arc;

use gantry_core::{HandlerError, RequestContext, ResponseWriter, RouteEntry};
use serde_json::Value;
use tracing::{debug, info};

use crate::path_rule::{ExcludeSet, PathRule};

/// What the handler produced, as seen by post-hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Completion<'a> {
    /// Whether the handler was invoked at all.
    pub invoked: bool,
    /// The serialized payload, if the handler returned one.
    pub payload: Option<&'a Value>,
    /// The error the handler returned or the result resolver raised.
    pub error: Option<&'a HandlerError>,
}

impl<'a> Completion<'a> {
    /// A completion for a request rejected before the handler ran.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            invoked: false,
            payload: None,
            error: None,
        }
    }

    /// A completion for a handler that ran.
    #[must_use]
    pub const fn invoked(payload: Option<&'a Value>, error: Option<&'a HandlerError>) -> Self {
        Self {
            invoked: true,
            payload,
            error,
        }
    }

    /// Returns true if the handler ran and produced no error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.invoked && self.error.is_none()
    }
}

/// A pre/post hook around handler invocation.
///
/// Both hooks default to doing nothing, so an interceptor only implements
/// what it needs.
///
/// # Example
///
/// ```
/// use gantry_core::{RequestContext, ResponseWriter, RouteEntry};
/// use gantry_middleware::Interceptor;
/// use http::StatusCode;
///
/// struct RequireToken;
///
/// impl Interceptor for RequireToken {
///     fn name(&self) -> &'static str {
///         "require_token"
///     }
///
///     fn pre_handle(
///         &self,
///         request: &mut RequestContext,
///         response: &ResponseWriter,
///         _route: &RouteEntry,
///     ) -> bool {
///         if request.header("token").is_some() {
///             return true;
///         }
///         response.write_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "token required");
///         false
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Runs before the handler. Returning `false` stops the request.
    ///
    /// The request may be rewritten in place; the handler sees the result.
    fn pre_handle(
        &self,
        request: &mut RequestContext,
        response: &ResponseWriter,
        route: &RouteEntry,
    ) -> bool {
        let _ = (request, response, route);
        true
    }

    /// Runs after the handler, or after a rejection, for every interceptor
    /// whose pre-hook ran.
    fn after_handle(
        &self,
        request: &RequestContext,
        response: &ResponseWriter,
        route: &RouteEntry,
        completion: &Completion<'_>,
    ) {
        let _ = (request, response, route, completion);
    }
}

/// The outcome of the pre-phase.
#[derive(Debug, Clone, Default)]
pub struct PreOutcome {
    executed: Vec<usize>,
    rejected_by: Option<PathRule>,
}

impl PreOutcome {
    /// Returns true if no interceptor rejected the request.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.rejected_by.is_none()
    }

    /// The rule of the interceptor that rejected the request.
    #[must_use]
    pub const fn rejected_by(&self) -> Option<&PathRule> {
        self.rejected_by.as_ref()
    }

    /// Registration indices of interceptors whose pre-hook ran, in order.
    #[must_use]
    pub fn executed(&self) -> &[usize] {
        &self.executed
    }
}

/// Ordered, path-scoped interceptors.
#[derive(Default)]
pub struct InterceptorRegister {
    interceptors: Vec<(PathRule, Arc<dyn Interceptor>)>,
    excludes: ExcludeSet,
}

impl InterceptorRegister {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor applied to paths matching `rule`.
    #[must_use]
    pub fn interceptor(mut self, rule: &str, interceptor: Arc<dyn Interceptor>) -> Self {
        self.push(rule, interceptor);
        self
    }

    /// Appends an interceptor in place.
    pub fn push(&mut self, rule: &str, interceptor: Arc<dyn Interceptor>) {
        let rule = PathRule::parse(rule);
        info!(interceptor = interceptor.name(), "The Interceptor [{rule}] registered.");
        self.interceptors.push((rule, interceptor));
    }

    /// Lets paths matching `rule` bypass every interceptor.
    #[must_use]
    pub fn exclude(mut self, rule: &str) -> Self {
        self.excludes.insert(rule);
        self
    }

    /// Adds an exclusion in place.
    pub fn push_exclude(&mut self, rule: &str) {
        self.excludes.insert(rule);
    }

    /// Number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if no interceptors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs applicable pre-hooks in registration order, stopping at the
    /// first rejection.
    pub fn iterate_pre(
        &self,
        request: &mut RequestContext,
        response: &ResponseWriter,
        route: &RouteEntry,
    ) -> PreOutcome {
        let mut outcome = PreOutcome::default();
        let path = request.normalized_path();
        if self.excludes.matches(&path) {
            return outcome;
        }

        for (index, (rule, interceptor)) in self.interceptors.iter().enumerate() {
            if !rule.matches(&path) {
                continue;
            }
            outcome.executed.push(index);
            if !interceptor.pre_handle(request, response, route) {
                debug!(interceptor = interceptor.name(), rule = %rule, path = %path, "request rejected by interceptor");
                outcome.rejected_by = Some(rule.clone());
                break;
            }
        }
        outcome
    }

    /// Runs the post-hook of every interceptor whose pre-hook ran, in
    /// reverse order.
    pub fn iterate_post(
        &self,
        outcome: &PreOutcome,
        request: &RequestContext,
        response: &ResponseWriter,
        route: &RouteEntry,
        completion: &Completion<'_>,
    ) {
        for &index in outcome.executed.iter().rev() {
            if let Some((_, interceptor)) = self.interceptors.get(index) {
                interceptor.after_handle(request, response, route, completion);
            }
        }
    }
}

impl fmt::Debug for InterceptorRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interceptors: Vec<String> = self
            .interceptors
            .iter()
            .map(|(rule, interceptor)| format!("{} @ {rule}", interceptor.name()))
            .collect();
        f.debug_struct("InterceptorRegister")
            .field("interceptors", &interceptors)
            .field("excludes", &self.excludes)
            .finish()
    }
}
