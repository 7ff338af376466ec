//! Static resources served for paths no route matches.
//!
//! # Example
//!
//! ```rust
//! use gantry_server::StaticResources;
//!
//! let assets = StaticResources::new("./public")
//!     .prefix("/assets")
//!     .index("index.html")
//!     .cache_control("max-age=3600");
//! assert_eq!(assets.url_prefix(), "/assets");
//! ```
//!
//! # Security
//!
//! - `..` segments are rejected
//! - hidden files (a segment starting with `.`) are rejected unless enabled
//! - the resolved file must stay inside the root after following symlinks

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use gantry_core::{RequestContext, ResponseWriter};
use gantry_router::normalize_path;
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Why a static resource was not served.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// No file at the path.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The path is not allowed.
    #[error("forbidden path: {0}")]
    Forbidden(String),

    /// Only `GET` and `HEAD` are served.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StaticFileError {
    /// The status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the dispatcher should treat this like an unmatched route.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Serves files from a directory.
#[derive(Debug, Clone)]
pub struct StaticResources {
    root: PathBuf,
    prefix: String,
    index_file: Option<String>,
    cache_control: Option<String>,
    last_modified: bool,
    serve_hidden: bool,
    mime_types: HashMap<String, String>,
}

impl StaticResources {
    /// Serves `root` at the URL root.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            prefix: "/".to_string(),
            index_file: None,
            cache_control: None,
            last_modified: true,
            serve_hidden: false,
            mime_types: HashMap::new(),
        }
    }

    /// Serves only under `prefix`, which is stripped before resolving.
    #[must_use]
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_path(prefix);
        self
    }

    /// File served for directory paths.
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index_file = Some(index.into());
        self
    }

    /// `Cache-Control` value added to every file.
    #[must_use]
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Sends `Last-Modified` and honours `If-Modified-Since`. On by default.
    #[must_use]
    pub fn last_modified(mut self, enabled: bool) -> Self {
        self.last_modified = enabled;
        self
    }

    /// Allows files and directories whose name starts with `.`.
    #[must_use]
    pub fn serve_hidden(mut self, enabled: bool) -> Self {
        self.serve_hidden = enabled;
        self
    }

    /// Maps an extension (without the dot) to a content type.
    #[must_use]
    pub fn mime_type(mut self, extension: impl Into<String>, mime: impl Into<String>) -> Self {
        self.mime_types
            .insert(extension.into().to_lowercase(), mime.into());
        self
    }

    /// The directory served.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The URL prefix served.
    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.prefix
    }

    /// Writes the file for `request` to `response`.
    ///
    /// # Errors
    ///
    /// Nothing is written when an error is returned.
    pub fn serve(
        &self,
        request: &RequestContext,
        response: &ResponseWriter,
    ) -> Result<(), StaticFileError> {
        let method = request.method();
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let path = request.normalized_path();
        let relative = self
            .strip_prefix(&path)
            .ok_or_else(|| StaticFileError::NotFound(path.clone()))?;
        let mut file = self.resolve_path(relative)?;

        if file.is_dir() {
            let index = self
                .index_file
                .as_ref()
                .map(|index| file.join(index))
                .filter(|index| index.is_file())
                .ok_or_else(|| StaticFileError::NotFound(path.clone()))?;
            file = index;
        }

        let metadata = std::fs::metadata(&file)?;
        let modified = metadata.modified().ok();

        if let Some(cache_control) = &self.cache_control {
            response.insert_header(header::CACHE_CONTROL.as_str(), cache_control);
        }
        if self.last_modified {
            if let Some(modified) = modified {
                if not_modified_since(request, modified) {
                    debug!(path = %path, "static resource not modified");
                    response.set_status(StatusCode::NOT_MODIFIED);
                    return Ok(());
                }
                response.insert_header(
                    header::LAST_MODIFIED.as_str(),
                    &httpdate::fmt_http_date(modified),
                );
            }
        }

        response.insert_header(header::CONTENT_TYPE.as_str(), &self.detect_mime_type(&file));
        response.set_status(StatusCode::OK);
        if method == Method::HEAD {
            response.set_header(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        } else {
            response.write(&std::fs::read(&file)?);
        }
        debug!(path = %path, file = %file.display(), "served static resource");
        Ok(())
    }

    fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    fn resolve_path(&self, request_path: &str) -> Result<PathBuf, StaticFileError> {
        let relative = request_path.trim_start_matches('/');

        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir => {
                    return Err(StaticFileError::Forbidden(
                        "directory traversal not allowed".to_string(),
                    ));
                }
                Component::Normal(name)
                    if !self.serve_hidden
                        && name.to_str().is_some_and(|name| name.starts_with('.')) =>
                {
                    return Err(StaticFileError::Forbidden(
                        "hidden files not allowed".to_string(),
                    ));
                }
                _ => {}
            }
        }

        let full = self.root.join(relative);
        let canonical = full
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        let root = self
            .root
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        if !canonical.starts_with(&root) {
            return Err(StaticFileError::Forbidden(
                "path escapes root directory".to_string(),
            ));
        }
        Ok(canonical)
    }

    fn detect_mime_type(&self, path: &Path) -> String {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if let Some(mime) = self.mime_types.get(&extension) {
            return mime.clone();
        }

        match extension.as_str() {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" | "mjs" => "text/javascript; charset=utf-8",
            "json" | "map" => "application/json",
            "xml" => "application/xml",
            "txt" => "text/plain; charset=utf-8",
            "csv" => "text/csv; charset=utf-8",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "webp" => "image/webp",
            "ico" => "image/x-icon",
            "woff" => "font/woff",
            "woff2" => "font/woff2",
            "ttf" => "font/ttf",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
        .to_string()
    }
}

fn not_modified_since(request: &RequestContext, modified: SystemTime) -> bool {
    let Some(since) = request
        .header(header::IF_MODIFIED_SINCE.as_str())
        .and_then(|value| httpdate::parse_http_date(value).ok())
    else {
        return false;
    };
    match (
        modified.duration_since(SystemTime::UNIX_EPOCH),
        since.duration_since(SystemTime::UNIX_EPOCH),
    ) {
        (Ok(modified), Ok(since)) => modified.as_secs() <= since.as_secs(),
        _ => false,
    }
}
