//! URL-encoded form bodies.

use gantry_core::{ExtractionError, ExtractionSource, RequestContext};
use http::Method;

/// Media type of URL-encoded form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Returns true for methods whose form body is consulted for parameters.
#[must_use]
pub fn carries_form(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Returns true if the request has a URL-encoded form body.
#[must_use]
pub fn is_form(request: &RequestContext) -> bool {
    request.content_type() == Some(FORM_CONTENT_TYPE)
}

/// Decodes the request's form body into `(name, value)` pairs.
///
/// Requests that do not carry a form body yield no pairs.
///
/// # Errors
///
/// Returns an error if the body is larger than `max_size` or is not valid
/// form encoding.
pub fn parse_form(
    request: &RequestContext,
    max_size: usize,
) -> Result<Vec<(String, String)>, ExtractionError> {
    if !carries_form(request.method()) || !is_form(request) {
        return Ok(Vec::new());
    }
    let body = request.body();
    if body.len() > max_size {
        return Err(ExtractionError::payload_too_large(max_size, body.len()));
    }
    serde_urlencoded::from_bytes(body).map_err(|e| {
        ExtractionError::deserialization_failed(ExtractionSource::Body, "form", e.to_string())
    })
}

/// The first non-empty value for `name`.
#[must_use]
pub fn first_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.as_str())
}
