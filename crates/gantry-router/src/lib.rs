//! Specificity-ordered route table for Gantry.
//!
//! This crate owns the routing data structures of the request pipeline:
//!
//! - [`PathPattern`]: compiles RESTful templates such as `/users/{id}` and
//!   extracts path variables positionally.
//! - [`RouteTable`]: a path-keyed registry with an exact-lookup map and a
//!   derived sequence ordered by specificity, scanned when no exact entry
//!   exists.
//! - [`MethodSet`]: the HTTP methods a route accepts (`GET` by default).
//! - [`Params`]: extracted path variables.
//!
//! The table is generic over the stored value so that the pipeline can keep
//! its own route entry type here without this crate knowing about handlers.
//!
//! # Example
//!
//! ```rust
//! use gantry_router::RouteTable;
//!
//! let mut table = RouteTable::new();
//! table.register("/a/{x}/c", "templated").unwrap();
//! table.register("/a/b/c", "literal").unwrap();
//!
//! assert_eq!(**table.find("/a/b/c").unwrap().value(), "literal");
//! assert_eq!(**table.find("/a/q/c").unwrap().value(), "templated");
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod methods;
mod params;
mod pattern;
mod table;

pub use methods::MethodSet;
pub use params::Params;
pub use pattern::{PathPattern, PatternError};
pub use table::{Route, RouteMatch, RouteTable};

/// Normalizes a request or registration path.
///
/// Collapses repeated slashes, guarantees a leading `/` and strips a
/// trailing `/` except for the root path.
///
/// ```rust
/// assert_eq!(gantry_router::normalize_path("//api//users/"), "/api/users");
/// assert_eq!(gantry_router::normalize_path(""), "/");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Joins path fragments with `/` and normalizes the result.
///
/// ```rust
/// assert_eq!(gantry_router::join_paths(&["/api", "users/", "/{id}"]), "/api/users/{id}");
/// assert_eq!(gantry_router::join_paths(&["", "", "/"]), "/");
/// ```
#[must_use]
pub fn join_paths(parts: &[&str]) -> String {
    normalize_path(&parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/users/"), "/users");
        assert_eq!(normalize_path("users"), "/users");
        assert_eq!(normalize_path("/a//b///c/"), "/a/b/c");
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths(&["/ctx", "/base", "/path"]), "/ctx/base/path");
        assert_eq!(join_paths(&["", "/base", ""]), "/base");
        assert_eq!(join_paths(&["ctx", "", "{id}"]), "/ctx/{id}");
    }
}
