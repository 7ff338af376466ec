//! Error resolution: writing failures to the response.

use gantry_core::{ExtractionError, HandlerError, ResponseWriter};
use http::StatusCode;

/// Writes an error response.
///
/// Used for every failure the dispatcher reports that has no per-status
/// handler configured.
pub trait ErrorResolver: Send + Sync {
    /// Writes `status` with a machine `code` and a human `message`.
    fn resolve(&self, status: StatusCode, code: &str, message: &str, response: &ResponseWriter);

    /// Writes an extraction failure.
    fn resolve_extraction(&self, err: &ExtractionError, response: &ResponseWriter) {
        self.resolve(err.status_code(), err.error_code(), err.message(), response);
    }

    /// Writes a handler failure.
    fn resolve_handler(&self, err: &HandlerError, response: &ResponseWriter) {
        self.resolve(err.status_code(), err.error_code(), err.message(), response);
    }
}

/// Writes the JSON error envelope: `{"error":{"code":..,"message":..}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorResolver;

impl ErrorResolver for JsonErrorResolver {
    fn resolve(&self, status: StatusCode, code: &str, message: &str, response: &ResponseWriter) {
        response.write_error(status, code, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{ErrorEnvelope, ExtractionSource};

    fn envelope(response: &ResponseWriter) -> ErrorEnvelope {
        serde_json::from_slice(&response.body()).unwrap()
    }

    #[test]
    fn test_resolve_writes_envelope() {
        let response = ResponseWriter::new();
        JsonErrorResolver.resolve(StatusCode::NOT_FOUND, "NOT_FOUND", "no route", &response);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(envelope(&response), ErrorEnvelope::new("NOT_FOUND", "no route"));
    }

    #[test]
    fn test_resolve_extraction() {
        let response = ResponseWriter::new();
        let err = ExtractionError::missing(ExtractionSource::Header, "Token");
        JsonErrorResolver.resolve_extraction(&err, &response);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(envelope(&response).error.code, "MISSING_PARAMETER");
    }

    #[test]
    fn test_resolve_handler() {
        let response = ResponseWriter::new();
        let err = HandlerError::new("boom").with_status(StatusCode::CONFLICT).with_code("TAKEN");
        JsonErrorResolver.resolve_handler(&err, &response);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(envelope(&response), ErrorEnvelope::new("TAKEN", "boom"));
    }
}
