//! Path rules used to scope filters and interceptors.

use std::fmt;

use gantry_router::normalize_path;

/// Where a filter or interceptor applies.
///
/// | Rule         | Matches                                          |
/// |--------------|--------------------------------------------------|
/// | `/`          | every request                                    |
/// | `/api/*`     | `/api/` followed by at least one more character  |
/// | `/api/users` | exactly `/api/users`                             |
///
/// # Example
///
/// ```
/// use gantry_middleware::PathRule;
///
/// let rule = PathRule::parse("/api/*");
/// assert!(rule.matches("/api/users"));
/// assert!(!rule.matches("/api"));
/// assert!(PathRule::parse("/").matches("/anything"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    /// Matches every request.
    All,
    /// Matches one normalized path.
    Exact(String),
    /// Matches any path strictly below the prefix.
    Prefix(String),
}

impl PathRule {
    /// Parses a rule. A trailing `/*` (or `/**`) makes it a prefix rule.
    #[must_use]
    pub fn parse(rule: &str) -> Self {
        let trimmed = rule.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Self::All;
        }
        let without_stars = trimmed.trim_end_matches('*');
        if without_stars.len() < trimmed.len() && without_stars.ends_with('/') {
            let prefix = without_stars.trim_end_matches('/');
            return if prefix.is_empty() {
                Self::Prefix(String::new())
            } else {
                Self::Prefix(normalize_path(prefix))
            };
        }
        Self::Exact(normalize_path(trimmed))
    }

    /// Returns true if `path` falls under this rule.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(exact) => exact == path,
            Self::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|rest| !rest.is_empty()),
        }
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("/"),
            Self::Exact(path) => f.write_str(path),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
        }
    }
}

impl From<&str> for PathRule {
    fn from(rule: &str) -> Self {
        Self::parse(rule)
    }
}

/// Paths that bypass a filter chain or interceptor register entirely.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    rules: Vec<PathRule>,
}

impl ExcludeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Adding the same rule twice has no effect.
    pub fn insert(&mut self, rule: &str) {
        let rule = PathRule::parse(rule);
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// Returns true if any rule matches `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(path))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
