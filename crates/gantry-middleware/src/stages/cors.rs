//! CORS (Cross-Origin Resource Sharing) filter.
//!
//! Adds the configured `Access-Control-*` headers to every request it
//! applies to. `OPTIONS` requests are answered with `204 No Content` and
//! never reach routing.
//!
//! ## Defaults
//!
//! | Header                             | Default                                  |
//! |------------------------------------|------------------------------------------|
//! | `Access-Control-Allow-Origin`      | `*`                                      |
//! | `Access-Control-Allow-Methods`     | `OPTIONS, GET, POST, PUT, DELETE, HEAD`  |
//! | `Access-Control-Allow-Credentials` | `false`                                  |
//! | `Access-Control-Max-Age`           | `3600`                                   |
//!
//! ## Example
//!
//! ```
//! use gantry_middleware::stages::CorsFilter;
//! use http::Method;
//! use std::time::Duration;
//!
//! let cors = CorsFilter::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_methods([Method::GET, Method::POST])
//!     .allow_headers(["Content-Type", "Token"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(600))
//!     .build();
//! ```

use std::time::Duration;

use gantry_core::{RequestContext, ResponseWriter};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use tracing::trace;

use crate::filter::{Filter, Next};

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Expose-Headers` header.
    pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";
}

/// The set of origins a [`CorsFilter`] announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin (`*`).
    Any,
    /// Specific origins, in the order they were added.
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Checks if an origin is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.iter().any(|o| o == origin),
        }
    }

    /// The `Access-Control-Allow-Origin` value.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Any => "*".to_string(),
            Self::List(origins) => origins.join(", "),
        }
    }
}

/// Configuration for [`CorsFilter`].
#[derive(Debug, Clone)]
pub struct CorsConfig {
    allowed_origins: AllowedOrigins,
    allowed_methods: Vec<Method>,
    allowed_headers: Vec<String>,
    expose_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            allowed_methods: vec![
                Method::OPTIONS,
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::HEAD,
            ],
            allowed_headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: Duration::from_secs(3600),
        }
    }
}

impl CorsConfig {
    /// The announced origins.
    #[must_use]
    pub const fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed_origins
    }

    /// The announced methods.
    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        &self.allowed_methods
    }

    /// Whether credentials are allowed.
    #[must_use]
    pub const fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    /// The preflight cache duration.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }
}

/// Builder for [`CorsFilter`].
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    config: CorsConfig,
}

impl CorsBuilder {
    /// Creates a builder with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows any origin (`*`).
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.config.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin. The first call replaces the `*` default.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        match &mut self.config.allowed_origins {
            AllowedOrigins::Any => {
                self.config.allowed_origins = AllowedOrigins::List(vec![origin.into()]);
            }
            AllowedOrigins::List(origins) => origins.push(origin.into()),
        }
        self
    }

    /// Sets the allowed methods.
    #[must_use]
    pub fn allow_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.config.allowed_methods = methods.into_iter().collect();
        self
    }

    /// Sets the allowed request headers.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets headers exposed to scripts.
    #[must_use]
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether cookies and authorization headers may be sent.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = allow;
        self
    }

    /// Sets how long browsers may cache preflight results.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.config.max_age = duration;
        self
    }

    /// Builds the filter.
    #[must_use]
    pub fn build(self) -> CorsFilter {
        CorsFilter::from_config(self.config)
    }
}

/// Filter that announces CORS policy and answers `OPTIONS` requests.
#[derive(Debug, Clone)]
pub struct CorsFilter {
    config: CorsConfig,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for CorsFilter {
    fn default() -> Self {
        Self::from_config(CorsConfig::default())
    }
}

impl CorsFilter {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Creates a filter from a configuration.
    #[must_use]
    pub fn from_config(config: CorsConfig) -> Self {
        let headers = Self::render(&config);
        Self { config, headers }
    }

    /// The effective configuration.
    #[must_use]
    pub const fn config(&self) -> &CorsConfig {
        &self.config
    }

    fn render(config: &CorsConfig) -> Vec<(HeaderName, HeaderValue)> {
        let methods: Vec<&str> = config.allowed_methods.iter().map(Method::as_str).collect();
        let mut pairs = vec![
            (headers::ALLOW_ORIGIN, config.allowed_origins.header_value()),
            (headers::ALLOW_METHODS, methods.join(", ")),
        ];
        if !config.allowed_headers.is_empty() {
            pairs.push((headers::ALLOW_HEADERS, config.allowed_headers.join(", ")));
        }
        if !config.expose_headers.is_empty() {
            pairs.push((headers::EXPOSE_HEADERS, config.expose_headers.join(", ")));
        }
        pairs.push((headers::ALLOW_CREDENTIALS, config.allow_credentials.to_string()));
        pairs.push((headers::MAX_AGE, config.max_age.as_secs().to_string()));

        pairs
            .into_iter()
            .filter_map(|(name, value)| {
                Some((
                    HeaderName::from_static(name),
                    HeaderValue::from_str(&value).ok()?,
                ))
            })
            .collect()
    }
}

impl Filter for CorsFilter {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn do_filter(&self, request: RequestContext, response: &ResponseWriter, next: Next<'_>) {
        for (name, value) in &self.headers {
            response.set_header(name.clone(), value.clone());
        }

        if request.method() == Method::OPTIONS {
            trace!(path = request.path(), "answering OPTIONS request");
            response.set_status(StatusCode::NO_CONTENT);
            return;
        }

        next.run(request, response);
    }
}
