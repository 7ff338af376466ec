//! Allowed HTTP methods for a single route.

use std::fmt;

use http::Method;
use indexmap::IndexSet;

/// The set of HTTP methods a route accepts.
///
/// Insertion order is kept so that diagnostics list methods the way they
/// were declared. An empty set is never observable: [`MethodSet::effective`]
/// and [`MethodSet::contains`] treat it as `GET` only.
///
/// # Example
///
/// ```rust
/// use gantry_router::MethodSet;
/// use http::Method;
///
/// let methods = MethodSet::new().with(Method::GET).with(Method::POST);
/// assert!(methods.contains(&Method::POST));
/// assert!(!methods.contains(&Method::DELETE));
/// assert_eq!(methods.to_string(), "[GET, POST]");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    inner: IndexSet<Method>,
}

impl MethodSet {
    /// Creates an empty set (accepts `GET` until a method is added).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single method.
    #[must_use]
    pub fn single(method: Method) -> Self {
        Self::new().with(method)
    }

    /// Adds a method.
    #[must_use]
    pub fn with(mut self, method: Method) -> Self {
        self.insert(method);
        self
    }

    /// Adds a method in place. Returns false if it was already present.
    pub fn insert(&mut self, method: Method) -> bool {
        self.inner.insert(method)
    }

    /// Returns true if the route accepts `method`.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        if self.inner.is_empty() {
            return *method == Method::GET;
        }
        self.inner.contains(method)
    }

    /// Returns true if any of `methods` is accepted.
    #[must_use]
    pub fn contains_any(&self, methods: &[Method]) -> bool {
        methods.iter().any(|m| self.contains(m))
    }

    /// The methods this route accepts, defaulting to `GET`.
    #[must_use]
    pub fn effective(&self) -> Vec<Method> {
        if self.inner.is_empty() {
            vec![Method::GET]
        } else {
            self.inner.iter().cloned().collect()
        }
    }

    /// Whether no method was declared explicitly.
    #[must_use]
    pub fn is_defaulted(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, method) in self.effective().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(method.as_str())?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_defaults_to_get() {
        let methods = MethodSet::new();
        assert!(methods.is_defaulted());
        assert!(methods.contains(&Method::GET));
        assert!(!methods.contains(&Method::POST));
        assert_eq!(methods.effective(), vec![Method::GET]);
        assert_eq!(methods.to_string(), "[GET]");
    }

    #[test]
    fn test_explicit_methods_replace_default() {
        let methods = MethodSet::single(Method::POST);
        assert!(!methods.contains(&Method::GET));
        assert!(methods.contains(&Method::POST));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut methods = MethodSet::new();
        assert!(methods.insert(Method::PUT));
        assert!(!methods.insert(Method::PUT));
        assert_eq!(methods.effective().len(), 1);
    }

    #[test]
    fn test_contains_any() {
        let methods: MethodSet = [Method::GET, Method::PUT].into_iter().collect();
        assert!(methods.contains_any(&[Method::POST, Method::PUT]));
        assert!(!methods.contains_any(&[Method::POST, Method::DELETE]));
    }

    #[test]
    fn test_display_keeps_declaration_order() {
        let methods = MethodSet::new().with(Method::DELETE).with(Method::GET);
        assert_eq!(methods.to_string(), "[DELETE, GET]");
    }
}
