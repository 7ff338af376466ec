//! Argument resolution: reading raw values for each parameter descriptor.

use std::borrow::Cow;

use gantry_core::{
    Argument, ExtractionError, ExtractionSource, FieldDescriptor, ParamDescriptor, ParamSource,
    RequestContext, RouteEntry,
};
use http::Method;
use serde_json::Value;
use tracing::{trace, warn};

use crate::form;
use crate::multipart::{MultipartConfig, MultipartForm, DEFAULT_MAX_MEMORY};

/// Turns a request into one raw [`Argument`] per parameter descriptor.
///
/// Implementations decide how values are read and decoded; conversion into
/// the handler's declared types happens afterwards through the route's
/// binding plan.
pub trait ArgumentResolver: Send + Sync {
    /// Resolves the arguments for `route`, in descriptor order.
    ///
    /// `templated` is true when the route was matched through its path
    /// template rather than by exact lookup.
    ///
    /// # Errors
    ///
    /// Returns the first extraction failure; the request must not proceed
    /// to the handler.
    fn resolve(
        &self,
        route: &RouteEntry,
        request: &RequestContext,
        templated: bool,
    ) -> Result<Vec<Argument>, ExtractionError>;
}

/// The default resolver.
///
/// | Source         | Read from                                                      |
/// |----------------|----------------------------------------------------------------|
/// | path variable  | the matching segment of a templated route, percent-decoded     |
/// | header         | the named request header                                       |
/// | body           | the JSON body of a `POST`/`PUT` request                         |
/// | file           | `multipart/form-data` file parts                                |
/// | value object   | per field: header, or the query/form lookup below              |
/// | query or form  | query string, then URL-encoded form body, then multipart field |
///
/// A required value that is absent or empty fails with `400`.
///
/// # Example
///
/// ```
/// use gantry_extract::DefaultArgumentResolver;
///
/// let resolver = DefaultArgumentResolver::new()
///     .max_body_size(1024 * 1024)
///     .lenient(true);
/// assert!(resolver.is_lenient());
/// ```
#[derive(Debug, Clone)]
pub struct DefaultArgumentResolver {
    max_body_size: usize,
    lenient: bool,
}

impl Default for DefaultArgumentResolver {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_MEMORY,
            lenient: false,
        }
    }
}

impl DefaultArgumentResolver {
    /// Creates a resolver with a 32 MiB body cap and strict body decoding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body size cap.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// With `lenient` set, an undecodable body is logged and left
    /// unresolved instead of failing the request.
    #[must_use]
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Whether body decode failures are tolerated.
    #[must_use]
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    fn path_variable(
        descriptor: &ParamDescriptor,
        route: &RouteEntry,
        request: &RequestContext,
        templated: bool,
    ) -> Result<Argument, ExtractionError> {
        if !templated {
            return Err(ExtractionError::invalid_type(
                ExtractionSource::Path,
                descriptor.name(),
                format!("route '{}' has no path variables", route.path()),
            ));
        }
        let path = request.normalized_path();
        let Some(raw) = route.pattern().value_of(&path, descriptor.name()) else {
            return Err(ExtractionError::missing(ExtractionSource::Path, descriptor.name()));
        };
        let value = urlencoding::decode(raw).map_err(|e| {
            ExtractionError::invalid_type(ExtractionSource::Path, descriptor.name(), e.to_string())
        })?;
        Ok(Argument::Text(value.into_owned()))
    }

    fn body(
        &self,
        descriptor: &ParamDescriptor,
        route: &RouteEntry,
        request: &RequestContext,
    ) -> Result<Argument, ExtractionError> {
        let method = request.method();
        let body_methods = [Method::POST, Method::PUT];
        if !body_methods.contains(method) || !route.methods().contains_any(&body_methods) {
            return Err(ExtractionError::method_not_allowed(descriptor.name(), method));
        }

        let body = request.body();
        if body.len() > self.max_body_size {
            return Err(ExtractionError::payload_too_large(self.max_body_size, body.len()));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Argument::Absent);
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Ok(Argument::Structured(value)),
            Err(e) if self.lenient => {
                warn!(parameter = descriptor.name(), error = %e, "request body could not be decoded");
                Ok(Argument::Absent)
            }
            Err(e) => Err(ExtractionError::deserialization_failed(
                ExtractionSource::Body,
                descriptor.name(),
                e.to_string(),
            )),
        }
    }
}

impl ArgumentResolver for DefaultArgumentResolver {
    fn resolve(
        &self,
        route: &RouteEntry,
        request: &RequestContext,
        templated: bool,
    ) -> Result<Vec<Argument>, ExtractionError> {
        let mut data = RequestData::new(request, self.max_body_size);
        let mut arguments = Vec::with_capacity(route.params().len());

        for descriptor in route.params() {
            let argument = match descriptor.source() {
                ParamSource::PathVariable => {
                    Self::path_variable(descriptor, route, request, templated)?
                }
                ParamSource::Header => text(request.header(descriptor.name())),
                ParamSource::Body => self.body(descriptor, route, request)?,
                ParamSource::File => {
                    let files = data.multipart()?.files(descriptor.name());
                    if files.is_empty() {
                        Argument::Absent
                    } else {
                        Argument::Files(files)
                    }
                }
                ParamSource::ValueObject => value_object(descriptor.fields(), &mut data)?,
                ParamSource::QueryOrForm => text(data.normal(descriptor.name())?.as_deref()),
            };

            if descriptor.is_required() && argument.is_empty() {
                return Err(ExtractionError::missing(
                    extraction_source(descriptor.source()),
                    descriptor.name(),
                ));
            }
            trace!(parameter = descriptor.name(), source = %descriptor.source(), "argument resolved");
            arguments.push(argument);
        }

        Ok(arguments)
    }
}

fn text(value: Option<&str>) -> Argument {
    value.map_or(Argument::Absent, |v| Argument::Text(v.to_string()))
}

fn extraction_source(source: ParamSource) -> ExtractionSource {
    match source {
        ParamSource::PathVariable => ExtractionSource::Path,
        ParamSource::Header => ExtractionSource::Header,
        ParamSource::Body => ExtractionSource::Body,
        ParamSource::File => ExtractionSource::File,
        ParamSource::QueryOrForm | ParamSource::ValueObject => ExtractionSource::Query,
    }
}

fn value_object(
    fields: &[FieldDescriptor],
    data: &mut RequestData<'_>,
) -> Result<Argument, ExtractionError> {
    let mut pairs = Vec::with_capacity(fields.len());
    for field in fields {
        let (value, source) = if field.is_header() {
            (
                data.request.header(field.name()).map(Cow::Borrowed),
                ExtractionSource::Header,
            )
        } else {
            (data.normal(field.name())?.map(Cow::Owned), ExtractionSource::Query)
        };
        match value {
            Some(value) if !value.is_empty() => {
                pairs.push((field.field().to_string(), value.into_owned()));
            }
            _ if field.is_required() => {
                return Err(ExtractionError::missing(source, field.name()));
            }
            _ => {}
        }
    }
    Ok(Argument::Fields(pairs))
}

/// Lazily decoded request bodies, shared by every descriptor of one
/// request.
struct RequestData<'r> {
    request: &'r RequestContext,
    max_body_size: usize,
    form: Option<Vec<(String, String)>>,
    multipart: Option<MultipartForm>,
}

impl<'r> RequestData<'r> {
    fn new(request: &'r RequestContext, max_body_size: usize) -> Self {
        Self {
            request,
            max_body_size,
            form: None,
            multipart: None,
        }
    }

    fn form(&mut self) -> Result<&[(String, String)], ExtractionError> {
        if self.form.is_none() {
            self.form = Some(form::parse_form(self.request, self.max_body_size)?);
        }
        Ok(self.form.get_or_insert_with(Vec::new))
    }

    fn multipart(&mut self) -> Result<&MultipartForm, ExtractionError> {
        if self.multipart.is_none() {
            let config = MultipartConfig::new().max_body_size(self.max_body_size);
            self.multipart = Some(MultipartForm::from_request(self.request, &config)?);
        }
        Ok(self.multipart.get_or_insert_with(MultipartForm::default))
    }

    /// Query string, then form body, then (for `POST`) multipart text.
    fn normal(&mut self, name: &str) -> Result<Option<String>, ExtractionError> {
        if let Some(value) = self.request.query_param(name) {
            return Ok(Some(value));
        }
        if let Some(value) = form::first_value(self.form()?, name) {
            return Ok(Some(value.to_string()));
        }
        if *self.request.method() == Method::POST {
            return Ok(self.multipart()?.field(name).map(str::to_string));
        }
        Ok(None)
    }
}
