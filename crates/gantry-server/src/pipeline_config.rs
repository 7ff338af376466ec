//! Pipeline configuration: the resolver slots and failure handlers the
//! dispatcher is built with.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gantry_config::GantryConfig;
use gantry_core::{RequestContext, ResponseWriter};
use gantry_extract::{
    ArgumentResolver, DefaultArgumentResolver, ErrorResolver, JsonErrorResolver,
    JsonResultResolver, ResultResolver, DEFAULT_MAX_MEMORY,
};
use http::StatusCode;

use crate::static_files::StaticResources;

/// A handler given full control of a failure response.
pub type StatusHandler = Arc<dyn Fn(&ResponseWriter, &RequestContext) + Send + Sync>;

/// Everything the dispatcher needs besides routes and interceptors.
///
/// # Example
///
/// ```rust
/// use gantry_server::PipelineConfig;
/// use http::StatusCode;
///
/// let config = PipelineConfig::builder()
///     .context_path("/api")
///     .lenient_body_decoding(true)
///     .not_found(|response, request| {
///         response.write_error(
///             StatusCode::NOT_FOUND,
///             "NO_SUCH_PAGE",
///             &format!("nothing at {}", request.path()),
///         );
///     })
///     .build();
///
/// assert_eq!(config.context_path(), "/api");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    context_path: String,
    argument_resolver: Arc<dyn ArgumentResolver>,
    result_resolver: Arc<dyn ResultResolver>,
    error_resolver: Arc<dyn ErrorResolver>,
    not_found: Option<StatusHandler>,
    method_not_allowed: Option<StatusHandler>,
    status_handlers: HashMap<StatusCode, StatusHandler>,
    static_resources: Option<StaticResources>,
    max_body_size: usize,
    lenient_body_decoding: bool,
}

impl PipelineConfig {
    /// Creates a builder with default values.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Builds a configuration from the `[server]` and `[web]` sections.
    #[must_use]
    pub fn from_web_config(config: &GantryConfig) -> Self {
        PipelineConfigBuilder::from_web_config(config).build()
    }

    /// Prefix applied to every registered route. Empty when unset.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Reads one raw value per parameter descriptor.
    #[must_use]
    pub fn argument_resolver(&self) -> &Arc<dyn ArgumentResolver> {
        &self.argument_resolver
    }

    /// Interprets and writes handler return values.
    #[must_use]
    pub fn result_resolver(&self) -> &Arc<dyn ResultResolver> {
        &self.result_resolver
    }

    /// Writes failures that have no dedicated handler.
    #[must_use]
    pub fn error_resolver(&self) -> &Arc<dyn ErrorResolver> {
        &self.error_resolver
    }

    /// Handler for unmatched paths.
    #[must_use]
    pub fn not_found(&self) -> Option<&StatusHandler> {
        self.not_found.as_ref()
    }

    /// Handler for a method the route does not accept.
    #[must_use]
    pub fn method_not_allowed(&self) -> Option<&StatusHandler> {
        self.method_not_allowed.as_ref()
    }

    /// Handler registered for `status`.
    #[must_use]
    pub fn status_handler(&self, status: StatusCode) -> Option<&StatusHandler> {
        self.status_handlers.get(&status)
    }

    /// Files served when no route matches.
    #[must_use]
    pub fn static_resources(&self) -> Option<&StaticResources> {
        self.static_resources.as_ref()
    }

    /// Body cap applied by the default argument resolver.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Whether undecodable values are left unresolved instead of failing.
    #[must_use]
    pub fn lenient_body_decoding(&self) -> bool {
        self.lenient_body_decoding
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<u16> = self.status_handlers.keys().map(StatusCode::as_u16).collect();
        statuses.sort_unstable();
        f.debug_struct("PipelineConfig")
            .field("context_path", &self.context_path)
            .field("not_found", &self.not_found.is_some())
            .field("method_not_allowed", &self.method_not_allowed.is_some())
            .field("status_handlers", &statuses)
            .field("static_resources", &self.static_resources)
            .field("max_body_size", &self.max_body_size)
            .field("lenient_body_decoding", &self.lenient_body_decoding)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Default)]
pub struct PipelineConfigBuilder {
    context_path: String,
    argument_resolver: Option<Arc<dyn ArgumentResolver>>,
    result_resolver: Option<Arc<dyn ResultResolver>>,
    error_resolver: Option<Arc<dyn ErrorResolver>>,
    not_found: Option<StatusHandler>,
    method_not_allowed: Option<StatusHandler>,
    status_handlers: HashMap<StatusCode, StatusHandler>,
    static_resources: Option<StaticResources>,
    max_body_size: Option<usize>,
    lenient_body_decoding: bool,
}

impl PipelineConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the `[server]` and `[web]` sections.
    #[must_use]
    pub fn from_web_config(config: &GantryConfig) -> Self {
        let mut builder = Self::new()
            .context_path(&config.web.context_path)
            .max_body_size(config.server.max_body_bytes)
            .lenient_body_decoding(config.web.lenient_body_decoding);
        if let Some(dir) = &config.web.static_dir {
            builder = builder.static_resources(StaticResources::new(dir));
        }
        builder
    }

    /// Sets the prefix applied to every registered route.
    #[must_use]
    pub fn context_path(mut self, path: &str) -> Self {
        self.context_path = path.to_string();
        self
    }

    /// Replaces the argument resolver. The body cap and lenient flag only
    /// apply to the default resolver.
    #[must_use]
    pub fn argument_resolver(mut self, resolver: impl ArgumentResolver + 'static) -> Self {
        self.argument_resolver = Some(Arc::new(resolver));
        self
    }

    /// Replaces the result resolver.
    #[must_use]
    pub fn result_resolver(mut self, resolver: impl ResultResolver + 'static) -> Self {
        self.result_resolver = Some(Arc::new(resolver));
        self
    }

    /// Replaces the error resolver.
    #[must_use]
    pub fn error_resolver(mut self, resolver: impl ErrorResolver + 'static) -> Self {
        self.error_resolver = Some(Arc::new(resolver));
        self
    }

    /// Handles unmatched paths.
    #[must_use]
    pub fn not_found<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ResponseWriter, &RequestContext) + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Handles requests whose method the route does not accept.
    #[must_use]
    pub fn method_not_allowed<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ResponseWriter, &RequestContext) + Send + Sync + 'static,
    {
        self.method_not_allowed = Some(Arc::new(handler));
        self
    }

    /// Handles every dispatcher failure with `status`.
    #[must_use]
    pub fn status_handler<F>(mut self, status: StatusCode, handler: F) -> Self
    where
        F: Fn(&ResponseWriter, &RequestContext) + Send + Sync + 'static,
    {
        self.status_handlers.insert(status, Arc::new(handler));
        self
    }

    /// Serves files for paths no route matches.
    #[must_use]
    pub fn static_resources(mut self, resources: StaticResources) -> Self {
        self.static_resources = Some(resources);
        self
    }

    /// Caps bodies read by the default argument resolver.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    /// Leaves undecodable values unresolved instead of answering `400`.
    #[must_use]
    pub fn lenient_body_decoding(mut self, lenient: bool) -> Self {
        self.lenient_body_decoding = lenient;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        let max_body_size = self.max_body_size.unwrap_or(DEFAULT_MAX_MEMORY);
        let lenient = self.lenient_body_decoding;
        PipelineConfig {
            context_path: self.context_path,
            argument_resolver: self.argument_resolver.unwrap_or_else(|| {
                Arc::new(
                    DefaultArgumentResolver::new()
                        .max_body_size(max_body_size)
                        .lenient(lenient),
                )
            }),
            result_resolver: self
                .result_resolver
                .unwrap_or_else(|| Arc::new(JsonResultResolver)),
            error_resolver: self
                .error_resolver
                .unwrap_or_else(|| Arc::new(JsonErrorResolver)),
            not_found: self.not_found,
            method_not_allowed: self.method_not_allowed,
            status_handlers: self.status_handlers,
            static_resources: self.static_resources,
            max_body_size,
            lenient_body_decoding: lenient,
        }
    }
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("context_path", &self.context_path)
            .field("max_body_size", &self.max_body_size)
            .field("lenient_body_decoding", &self.lenient_body_decoding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.context_path(), "");
        assert_eq!(config.max_body_size(), 32 << 20);
        assert!(!config.lenient_body_decoding());
        assert!(config.not_found().is_none());
        assert!(config.static_resources().is_none());
    }

    #[test]
    fn test_status_handlers() {
        let config = PipelineConfig::builder()
            .status_handler(StatusCode::BAD_REQUEST, |response, _| {
                response.set_status(StatusCode::IM_A_TEAPOT);
            })
            .build();
        let handler = config.status_handler(StatusCode::BAD_REQUEST).unwrap();
        let response = ResponseWriter::new();
        handler(&response, &RequestContext::new(http::Method::GET, "/".parse().unwrap()));
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(config.status_handler(StatusCode::NOT_FOUND).is_none());
    }

    #[test]
    fn test_from_web_config() {
        let mut section = GantryConfig::default();
        section.web.context_path = "/shop".to_string();
        section.web.static_dir = Some("./public".to_string());
        section.web.lenient_body_decoding = true;
        section.server.max_body_bytes = 2048;

        let config = PipelineConfig::from_web_config(&section);
        assert_eq!(config.context_path(), "/shop");
        assert_eq!(config.max_body_size(), 2048);
        assert!(config.lenient_body_decoding());
        assert_eq!(
            config.static_resources().unwrap().root(),
            std::path::Path::new("./public")
        );
    }

    #[test]
    fn test_debug_lists_statuses() {
        let config = PipelineConfig::builder()
            .status_handler(StatusCode::NOT_FOUND, |_, _| {})
            .status_handler(StatusCode::BAD_REQUEST, |_, _| {})
            .build();
        let debug = format!("{config:?}");
        assert!(debug.contains("[400, 404]"));
    }
}
