//! The filter chain that runs before routing.
//!
//! Filters form a chain of responsibility. Each filter receives the request
//! by value, the shared response writer, and a [`Next`] continuation. Calling
//! [`Next::run`] hands the request to the rest of the chain; returning
//! without calling it ends the request at that filter.
//!
//! ```text
//! request ─▶ filter 0 ─▶ filter 1 ─▶ ... ─▶ Dispatch
//!            (skipped when its rule does not match)
//! ```
//!
//! The position of the next filter is carried in the request's own
//! attribute bag, so concurrent requests never observe each other's cursor.

use std::fmt;
use std::sync::Arc;

use gantry_core::{RequestContext, ResponseWriter};
use tracing::{info, trace};

use crate::path_rule::{ExcludeSet, PathRule};

/// Attribute key holding the index of the next filter to consider.
pub const CURSOR_ATTRIBUTE: &str = "gantry.filter.cursor";

/// The terminal link of a [`FilterChain`].
pub trait Dispatch: Send + Sync {
    /// Handles a request that has passed every applicable filter.
    fn dispatch(&self, request: RequestContext, response: &ResponseWriter);
}

impl<F> Dispatch for F
where
    F: Fn(RequestContext, &ResponseWriter) + Send + Sync,
{
    fn dispatch(&self, request: RequestContext, response: &ResponseWriter) {
        self(request, response);
    }
}

/// A path-scoped behavior that runs before routing.
///
/// # Example
///
/// ```
/// use gantry_core::{RequestContext, ResponseWriter};
/// use gantry_middleware::{Filter, Next};
///
/// struct Timing;
///
/// impl Filter for Timing {
///     fn name(&self) -> &'static str {
///         "timing"
///     }
///
///     fn do_filter(&self, request: RequestContext, response: &ResponseWriter, next: Next<'_>) {
///         next.run(request, response);
///         response.insert_header("x-handled", "1");
///     }
/// }
/// ```
pub trait Filter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, calling `next` to continue the chain.
    fn do_filter(&self, request: RequestContext, response: &ResponseWriter, next: Next<'_>);
}

/// The rest of a filter chain.
pub struct Next<'a> {
    chain: &'a FilterChain,
}

impl Next<'_> {
    /// Continues with the next applicable filter, or the dispatcher when
    /// none remain.
    pub fn run(self, request: RequestContext, response: &ResponseWriter) {
        self.chain.run(request, response);
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("filters", &self.chain.len())
            .finish()
    }
}

/// Ordered, path-scoped filters in front of a dispatcher.
pub struct FilterChain {
    filters: Vec<(PathRule, Arc<dyn Filter>)>,
    excludes: ExcludeSet,
    dispatcher: Arc<dyn Dispatch>,
}

impl FilterChain {
    /// Creates an empty chain ending in `dispatcher`.
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            filters: Vec::new(),
            excludes: ExcludeSet::new(),
            dispatcher,
        }
    }

    /// Appends a filter applied to paths matching `rule`.
    #[must_use]
    pub fn filter(mut self, rule: &str, filter: Arc<dyn Filter>) -> Self {
        self.push(rule, filter);
        self
    }

    /// Appends a filter in place.
    pub fn push(&mut self, rule: &str, filter: Arc<dyn Filter>) {
        let rule = PathRule::parse(rule);
        info!(filter = filter.name(), "The Filter [{rule}] registered.");
        self.filters.push((rule, filter));
    }

    /// Lets paths matching `rule` bypass every filter.
    #[must_use]
    pub fn exclude(mut self, rule: &str) -> Self {
        self.excludes.insert(rule);
        self
    }

    /// Adds an exclusion in place.
    pub fn push_exclude(&mut self, rule: &str) {
        self.excludes.insert(rule);
    }

    /// Number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if no filters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the request through the remaining filters.
    pub fn run(&self, request: RequestContext, response: &ResponseWriter) {
        let path = request.normalized_path();
        if self.excludes.matches(&path) {
            trace!(path = %path, "path excluded from filters");
            self.dispatcher.dispatch(request, response);
            return;
        }

        let mut cursor = request
            .attribute::<usize>(CURSOR_ATTRIBUTE)
            .map_or(0, |cursor| *cursor);
        while let Some((rule, filter)) = self.filters.get(cursor) {
            cursor += 1;
            if rule.matches(&path) {
                trace!(path = %path, rule = %rule, filter = filter.name(), "filter matched");
                let request = request.with_attribute(CURSOR_ATTRIBUTE, cursor);
                filter.do_filter(request, response, Next { chain: self });
                return;
            }
            trace!(path = %path, rule = %rule, "filter skipped");
        }

        self.dispatcher.dispatch(request, response);
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<String> = self
            .filters
            .iter()
            .map(|(rule, filter)| format!("{} @ {rule}", filter.name()))
            .collect();
        f.debug_struct("FilterChain")
            .field("filters", &filters)
            .field("excludes", &self.excludes)
            .finish_non_exhaustive()
    }
}

/// Adapts a closure into a [`Filter`].
///
/// # Example
///
/// ```
/// use gantry_middleware::FnFilter;
///
/// let filter = FnFilter::new("tag", |request, response, next| {
///     response.insert_header("x-tag", "1");
///     next.run(request, response);
/// });
/// ```
pub struct FnFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnFilter<F>
where
    F: Fn(RequestContext, &ResponseWriter, Next<'_>) + Send + Sync + 'static,
{
    /// Creates a named filter from a closure.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(RequestContext, &ResponseWriter, Next<'_>) + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_filter(&self, request: RequestContext, response: &ResponseWriter, next: Next<'_>) {
        (self.func)(request, response, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log) -> Arc<dyn Dispatch> {
        let log = Arc::clone(log);
        Arc::new(move |request: RequestContext, _: &ResponseWriter| {
            log.lock().push(format!("dispatch {}", request.path()));
        })
    }

    fn tagging(name: &'static str, log: &Log) -> Arc<dyn Filter> {
        let log = Arc::clone(log);
        Arc::new(FnFilter::new(name, move |request, response, next| {
            log.lock().push(format!("{name} before"));
            next.run(request, response);
            log.lock().push(format!("{name} after"));
        }))
    }

    fn run(chain: &FilterChain, path: &str) -> ResponseWriter {
        let response = ResponseWriter::new();
        chain.run(RequestContext::new(Method::GET, path.parse().unwrap()), &response);
        response
    }

    #[test]
    fn test_empty_chain_dispatches() {
        let log = Log::default();
        let chain = FilterChain::new(recorder(&log));
        run(&chain, "/a");
        assert_eq!(*log.lock(), vec!["dispatch /a"]);
    }

    #[test]
    fn test_filters_wrap_in_order() {
        let log = Log::default();
        let chain = FilterChain::new(recorder(&log))
            .filter("/", tagging("first", &log))
            .filter("/*", tagging("second", &log));
        run(&chain, "/a");
        assert_eq!(
            *log.lock(),
            vec!["first before", "second before", "dispatch /a", "second after", "first after"]
        );
    }

    #[test]
    fn test_non_matching_filters_are_skipped() {
        let log = Log::default();
        let chain = FilterChain::new(recorder(&log))
            .filter("/admin/*", tagging("admin", &log))
            .filter("/login", tagging("login", &log))
            .filter("/", tagging("all", &log));
        run(&chain, "/login");
        assert_eq!(
            *log.lock(),
            vec!["login before", "all before", "dispatch /login", "all after", "login after"]
        );
    }

    #[test]
    fn test_excluded_path_bypasses_filters() {
        let log = Log::default();
        let chain = FilterChain::new(recorder(&log))
            .filter("/", tagging("all", &log))
            .exclude("/health");
        run(&chain, "/health/");
        assert_eq!(*log.lock(), vec!["dispatch /health/"]);
    }

    #[test]
    fn test_filter_can_short_circuit() {
        let log = Log::default();
        let chain = FilterChain::new(recorder(&log)).filter(
            "/",
            Arc::new(FnFilter::new("deny", |_, response: &ResponseWriter, _| {
                response.set_status(StatusCode::FORBIDDEN);
            })),
        );
        let response = run(&chain, "/a");
        assert!(log.lock().is_empty());
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_cursor_does_not_leak_between_requests() {
        let log = Log::default();
        let chain = FilterChain::new(recorder(&log)).filter("/", tagging("all", &log));
        run(&chain, "/a");
        run(&chain, "/b");
        assert_eq!(log.lock().iter().filter(|l| *l == "all before").count(), 2);
    }

    #[test]
    fn test_cursor_is_visible_downstream() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let dispatcher: Arc<dyn Dispatch> =
            Arc::new(move |request: RequestContext, _: &ResponseWriter| {
                *sink.lock() = request.attribute::<usize>(CURSOR_ATTRIBUTE).map(|c| *c);
            });
        let chain = FilterChain::new(dispatcher)
            .filter("/", Arc::new(FnFilter::new("a", |req, res, next| next.run(req, res))))
            .filter("/", Arc::new(FnFilter::new("b", |req, res, next| next.run(req, res))));
        run(&chain, "/x");
        assert_eq!(*seen.lock(), Some(2));
    }
}
