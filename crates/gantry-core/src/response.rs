//! The buffered response writer shared by filters, interceptors and
//! handlers.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ErrorEnvelope;

/// Content type written for JSON payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Default)]
struct Buffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

/// A cheaply clonable handle to one request's response.
///
/// Every stage of the pipeline writes through the same handle. The first
/// status written wins, mirroring how a status line can only be sent once;
/// headers and body may be appended until the response is converted.
///
/// # Example
///
/// ```
/// use gantry_core::ResponseWriter;
/// use http::StatusCode;
///
/// let writer = ResponseWriter::new();
/// writer.set_status(StatusCode::CREATED);
/// writer.set_status(StatusCode::OK);
/// writer.write(b"done");
///
/// assert_eq!(writer.status(), StatusCode::CREATED);
/// assert_eq!(writer.body().as_ref(), b"done");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    inner: Arc<Mutex<Buffer>>,
}

impl ResponseWriter {
    /// Creates an empty, uncommitted response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The status written so far, `200 OK` if none.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.lock().status.unwrap_or(StatusCode::OK)
    }

    /// Writes the status unless one was already written. Returns whether
    /// this call took effect.
    pub fn set_status(&self, status: StatusCode) -> bool {
        let mut buffer = self.inner.lock();
        if buffer.status.is_some() {
            return false;
        }
        buffer.status = Some(status);
        true
    }

    /// Sets a header, replacing any previous values.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.lock().headers.insert(name, value);
    }

    /// Appends a header value.
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.lock().headers.append(name, value);
    }

    /// Sets a header from strings, ignoring invalid names or values.
    pub fn insert_header(&self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.set_header(name, value);
        }
    }

    /// Reads a header as UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Appends bytes to the body. Writing the body commits `200 OK` if no
    /// status was set.
    pub fn write(&self, chunk: &[u8]) {
        let mut buffer = self.inner.lock();
        buffer.status.get_or_insert(StatusCode::OK);
        buffer.body.extend_from_slice(chunk);
    }

    /// Serializes `value` as JSON with the given status.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.set_status(status);
        self.set_header(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        self.write(&body);
        Ok(())
    }

    /// Writes a JSON error envelope.
    pub fn write_error(&self, status: StatusCode, code: &str, message: &str) {
        let envelope = ErrorEnvelope::new(code, message);
        if self.write_json(status, &envelope).is_err() {
            self.set_status(status);
        }
    }

    /// Whether a status or body byte has been written.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        let buffer = self.inner.lock();
        buffer.status.is_some() || !buffer.body.is_empty()
    }

    /// A snapshot of the body written so far.
    #[must_use]
    pub fn body(&self) -> Bytes {
        self.inner.lock().body.clone().freeze()
    }

    /// Converts the buffered state into an `http` response.
    #[must_use]
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let buffer = std::mem::take(&mut *self.inner.lock());
        let mut response = http::Response::new(Full::new(buffer.body.freeze()));
        *response.status_mut() = buffer.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = buffer.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_default_status_is_ok() {
        let writer = ResponseWriter::new();
        assert_eq!(writer.status(), StatusCode::OK);
        assert!(!writer.is_committed());
    }

    #[test]
    fn test_first_status_wins() {
        let writer = ResponseWriter::new();
        assert!(writer.set_status(StatusCode::NOT_FOUND));
        assert!(!writer.set_status(StatusCode::OK));
        assert_eq!(writer.status(), StatusCode::NOT_FOUND);
        assert!(writer.is_committed());
    }

    #[test]
    fn test_write_commits_ok() {
        let writer = ResponseWriter::new();
        writer.write(b"a");
        writer.write(b"b");
        assert!(!writer.set_status(StatusCode::BAD_REQUEST));
        assert_eq!(writer.body().as_ref(), b"ab");
    }

    #[test]
    fn test_clones_share_state() {
        let writer = ResponseWriter::new();
        let clone = writer.clone();
        clone.insert_header("x-trace", "1");
        assert_eq!(writer.header("x-trace").as_deref(), Some("1"));
    }

    #[test]
    fn test_write_json() {
        let writer = ResponseWriter::new();
        writer
            .write_json(StatusCode::OK, &serde_json::json!({"name": "a"}))
            .unwrap();
        assert_eq!(writer.header("content-type").as_deref(), Some(JSON_CONTENT_TYPE));
        let value: serde_json::Value = serde_json::from_slice(&writer.body()).unwrap();
        assert_eq!(value["name"], "a");
    }

    #[test]
    fn test_write_error_envelope() {
        let writer = ResponseWriter::new();
        writer.write_error(StatusCode::BAD_REQUEST, "MISSING_PARAMETER", "Token is required");
        assert_eq!(writer.status(), StatusCode::BAD_REQUEST);
        let value: serde_json::Value = serde_json::from_slice(&writer.body()).unwrap();
        assert_eq!(value["error"]["code"], "MISSING_PARAMETER");
    }

    #[test]
    fn test_into_response() {
        let writer = ResponseWriter::new();
        writer.set_status(StatusCode::ACCEPTED);
        writer.insert_header("x-a", "b");
        writer.write(b"body");

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-a"], "b");

        let body = block_on(response.into_body().collect()).unwrap();
        assert_eq!(body.to_bytes().as_ref(), b"body");
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(future)
    }
}
