//! The route table.
//!
//! Routes live in two views that are kept consistent on every insertion:
//! a map from normalized path to route for O(1) exact lookup, and a
//! sequence ordered by descending specificity that is scanned when no exact
//! entry exists.
//!
//! Specificity is compared on, in order:
//!
//! 1. number of `/`-delimited segments, more first;
//! 2. literal paths before templated paths;
//! 3. raw path length, longer first.
//!
//! Entries that compare equal keep their registration order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::pattern::{PathPattern, PatternError};
use crate::Params;

/// One entry of the ordered sequence.
#[derive(Debug)]
pub struct Route<T> {
    pattern: PathPattern,
    value: Arc<T>,
}

impl<T> Route<T> {
    /// The compiled template for this route.
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The normalized path this route was registered under.
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.template()
    }

    /// The stored value.
    #[must_use]
    pub fn value(&self) -> &Arc<T> {
        &self.value
    }
}

impl<T> Clone for Route<T> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

/// Result of [`RouteTable::find`].
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The matched route.
    pub route: &'a Route<T>,
    /// True when the route was reached through template matching rather
    /// than an exact lookup.
    pub templated: bool,
}

impl<'a, T> RouteMatch<'a, T> {
    /// The matched value.
    #[must_use]
    pub fn value(&self) -> &'a Arc<T> {
        &self.route.value
    }

    /// Extracts path variables for `path`. Empty for exact matches.
    #[must_use]
    pub fn params(&self, path: &str) -> Params {
        if self.templated {
            self.route.pattern.extract(path).unwrap_or_default()
        } else {
            Params::new()
        }
    }
}

/// A path-keyed registry ordered by specificity.
///
/// # Example
///
/// ```rust
/// use gantry_router::RouteTable;
///
/// let mut table = RouteTable::new();
/// table.register("/users/{id}", "show").unwrap();
/// table.register("/users/new", "new").unwrap();
///
/// let hit = table.find("/users/new").unwrap();
/// assert_eq!(**hit.value(), "new");
/// assert!(!hit.templated);
///
/// let hit = table.find("/users/7").unwrap();
/// assert_eq!(**hit.value(), "show");
/// assert_eq!(hit.params("/users/7").get("id"), Some("7"));
/// ```
#[derive(Debug)]
pub struct RouteTable<T> {
    by_path: HashMap<String, Route<T>>,
    ordered: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            by_path: HashMap::new(),
            ordered: Vec::new(),
        }
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `path`.
    ///
    /// Replacing keeps the entry's slot in the ordered sequence, so routing
    /// behaviour is unchanged when the same route is registered twice.
    /// Returns the previous value, if any.
    pub fn register(&mut self, path: &str, value: T) -> Result<Option<Arc<T>>, PatternError> {
        let value = Arc::new(value);

        if let Some(existing) = self.by_path.get_mut(path) {
            let previous = std::mem::replace(&mut existing.value, Arc::clone(&value));
            if let Some(route) = self.ordered.iter_mut().find(|r| r.path() == path) {
                route.value = value;
            }
            debug!(path, "replaced route entry");
            return Ok(Some(previous));
        }

        let pattern = PathPattern::parse(path)?;
        let at = self
            .ordered
            .partition_point(|r| specificity(&r.pattern, &pattern) != Ordering::Greater);
        debug!(path, position = at, templated = pattern.is_templated(), "registered route");

        let route = Route { pattern, value };
        self.by_path.insert(path.to_string(), route.clone());
        self.ordered.insert(at, route);
        Ok(None)
    }

    /// Exact lookup by normalized path.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Arc<T>> {
        self.by_path.get(path).map(Route::value)
    }

    /// The full sequence in specificity order.
    #[must_use]
    pub fn all(&self) -> &[Route<T>] {
        &self.ordered
    }

    /// Resolves a request path: exact lookup first, then the first templated
    /// route in specificity order whose pattern matches.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<RouteMatch<'_, T>> {
        if let Some(route) = self.by_path.get(path) {
            return Some(RouteMatch {
                route,
                templated: false,
            });
        }

        self.ordered
            .iter()
            .filter(|r| r.pattern.is_templated())
            .find(|r| r.pattern.matches(path))
            .map(|route| RouteMatch {
                route,
                templated: true,
            })
    }

    /// Number of registered paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Orders `a` relative to `b`: `Less` means `a` is more specific and sorts
/// first.
fn specificity(a: &PathPattern, b: &PathPattern) -> Ordering {
    b.segments()
        .cmp(&a.segments())
        .then_with(|| a.is_templated().cmp(&b.is_templated()))
        .then_with(|| b.template().len().cmp(&a.template().len()))
}
