//! RESTful path templates.
//!
//! A template such as `/users/{id}/posts/{postId}` is compiled into an
//! anchored regular expression where every `{name}` segment matches exactly
//! one path segment. Values are extracted positionally: the request path and
//! the template are both split on `/` and the segment at each variable's
//! index is read.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::Params;

/// Matches a `{name}` placeholder inside a template.
fn variable_regex() -> &'static Regex {
    static VARIABLE: OnceLock<Regex> = OnceLock::new();
    VARIABLE.get_or_init(|| {
        Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("variable regex is a valid constant")
    })
}

/// Error returned when a path template cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    template: String,
    reason: String,
}

impl PatternError {
    fn new(template: &str, reason: impl Into<String>) -> Self {
        Self {
            template: template.to_string(),
            reason: reason.into(),
        }
    }

    /// The template that failed to compile.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path template '{}': {}", self.template, self.reason)
    }
}

impl std::error::Error for PatternError {}

/// A compiled path template.
///
/// # Example
///
/// ```rust
/// use gantry_router::PathPattern;
///
/// let pattern = PathPattern::parse("/users/{id}").unwrap();
/// assert!(pattern.is_templated());
/// assert!(pattern.matches("/users/42"));
/// assert!(!pattern.matches("/users/42/posts"));
///
/// let params = pattern.extract("/users/42").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    /// Variables in declaration order, paired with their segment index.
    variables: Vec<(String, usize)>,
    segments: usize,
    regex: Option<Regex>,
}

impl PathPattern {
    /// Compiles a path template.
    ///
    /// Literal templates are accepted too; they simply never match anything
    /// but themselves.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        if !template.starts_with('/') {
            return Err(PatternError::new(template, "must start with '/'"));
        }

        let mut variables = Vec::new();
        let mut source = String::with_capacity(template.len() + 8);
        source.push('^');

        for (index, segment) in template.split('/').enumerate() {
            if index > 0 {
                source.push('/');
            }
            match variable_regex().captures(segment) {
                Some(caps) if caps.get(0).map(|m| m.as_str()) == Some(segment) => {
                    variables.push((caps[1].to_string(), index));
                    source.push_str("[^/]+");
                }
                Some(_) => {
                    return Err(PatternError::new(
                        template,
                        format!("variable must span the whole segment: '{segment}'"),
                    ));
                }
                None if segment.contains('{') || segment.contains('}') => {
                    return Err(PatternError::new(
                        template,
                        format!("unbalanced braces in segment '{segment}'"),
                    ));
                }
                None => source.push_str(&regex::escape(segment)),
            }
        }
        source.push('$');

        let regex = if variables.is_empty() {
            None
        } else {
            Some(Regex::new(&source).map_err(|e| PatternError::new(template, e.to_string()))?)
        };

        Ok(Self {
            template: template.to_string(),
            variables,
            segments: segment_count(template),
            regex,
        })
    }

    /// The original template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the template contains at least one `{name}` segment.
    #[must_use]
    pub fn is_templated(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Variable names in declaration order (duplicates preserved).
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    /// Number of `/`-delimited segments in the template.
    #[must_use]
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Segment index of a variable. Duplicated names resolve to the first
    /// occurrence.
    #[must_use]
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, index)| *index)
    }

    /// Returns true if `path` is matched by this template.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => self.template == path,
        }
    }

    /// Reads a single variable out of a path that this template matches.
    #[must_use]
    pub fn value_of<'p>(&self, path: &'p str, name: &str) -> Option<&'p str> {
        let index = self.variable_index(name)?;
        path.split('/').nth(index)
    }

    /// Extracts every variable from `path`, or `None` if it does not match.
    #[must_use]
    pub fn extract(&self, path: &str) -> Option<Params> {
        if !self.matches(path) {
            return None;
        }
        let parts: Vec<&str> = path.split('/').collect();
        let mut params = Params::with_capacity(self.variables.len());
        for (name, index) in &self.variables {
            if params.get(name).is_some() {
                continue;
            }
            if let Some(value) = parts.get(*index) {
                params.push(name.as_str(), *value);
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Counts `/`-delimited segments, ignoring empty ones.
pub(crate) fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = PathPattern::parse("/users/new").unwrap();
        assert!(!pattern.is_templated());
        assert!(pattern.matches("/users/new"));
        assert!(!pattern.matches("/users/old"));
        assert_eq!(pattern.segments(), 2);
    }

    #[test]
    fn test_single_variable() {
        let pattern = PathPattern::parse("/users/{id}").unwrap();
        assert!(pattern.is_templated());
        assert_eq!(pattern.variables().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(pattern.variable_index("id"), Some(2));
        assert!(pattern.matches("/users/42"));
        assert!(!pattern.matches("/users"));
        assert!(!pattern.matches("/users/"));
        assert!(!pattern.matches("/users/42/extra"));
    }

    #[test]
    fn test_multiple_variables() {
        let pattern = PathPattern::parse("/orgs/{org}/repos/{repo}").unwrap();
        let params = pattern.extract("/orgs/acme/repos/gantry").unwrap();
        assert_eq!(params.get("org"), Some("acme"));
        assert_eq!(params.get("repo"), Some("gantry"));
        assert_eq!(pattern.value_of("/orgs/acme/repos/gantry", "repo"), Some("gantry"));
    }

    #[test]
    fn test_duplicate_variable_resolves_to_first() {
        let pattern = PathPattern::parse("/a/{x}/b/{x}").unwrap();
        assert_eq!(pattern.variable_index("x"), Some(2));
        let params = pattern.extract("/a/1/b/2").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("x"), Some("1"));
    }

    #[test]
    fn test_literal_segments_are_escaped() {
        let pattern = PathPattern::parse("/files/{name}/v1.0").unwrap();
        assert!(pattern.matches("/files/a/v1.0"));
        assert!(!pattern.matches("/files/a/v1x0"));
    }

    #[test]
    fn test_extract_miss() {
        let pattern = PathPattern::parse("/users/{id}").unwrap();
        assert!(pattern.extract("/teams/1").is_none());
    }

    #[test]
    fn test_invalid_templates() {
        assert!(PathPattern::parse("users/{id}").is_err());
        assert!(PathPattern::parse("/users/{id").is_err());
        assert!(PathPattern::parse("/users/id-{id}").is_err());
        let err = PathPattern::parse("/users/{}").unwrap_err();
        assert_eq!(err.template(), "/users/{}");
    }

    proptest! {
        #[test]
        fn prop_variable_roundtrip(value in "[A-Za-z0-9_-]{1,16}") {
            let pattern = PathPattern::parse("/items/{id}/detail").unwrap();
            let path = format!("/items/{value}/detail");
            let params = pattern.extract(&path).unwrap();
            prop_assert_eq!(params.get("id"), Some(value.as_str()));
        }

        #[test]
        fn prop_variable_never_spans_segments(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let pattern = PathPattern::parse("/items/{id}").unwrap();
            let path = format!("/items/{a}/{b}");
            prop_assert!(!pattern.matches(&path));
        }
    }
}
