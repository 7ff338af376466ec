//! Error types for the request pipeline.
//!
//! Errors fall into four groups:
//!
//! | Type | When | Outcome |
//! |---|---|---|
//! | [`RegistrationError`] | building the pipeline | start-up aborts |
//! | [`ExtractionError`] | binding request data to parameters | 400 / 405 / 413 response |
//! | [`HandlerError`] | returned by a handler | error response, status chosen by the handler |
//! | [`InvokeError`] | argument list does not fit the handler | 500 response |
//!
//! Every error written to the wire uses the [`ErrorEnvelope`] shape:
//! `{"error":{"code":"...","message":"..."}}`.

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a value was being read from when extraction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// A `{name}` segment of a templated route.
    Path,
    /// Query string, form body or posted multipart field.
    Query,
    /// An HTTP header.
    Header,
    /// The structured request body.
    Body,
    /// A multipart file upload.
    File,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Classification of an [`ExtractionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// Required value is absent or empty.
    Missing,
    /// Value is present but cannot be converted to the target type.
    InvalidType,
    /// Structured body could not be decoded.
    DeserializationFailed,
    /// Body binding attempted on a verb or route that does not carry a body.
    MethodNotAllowed,
    /// Body exceeds the configured cap.
    PayloadTooLarge,
    /// Multipart payload could not be parsed.
    MalformedUpload,
    /// Anything else; carries its own status.
    Custom(StatusCode),
}

/// Failure to bind a request value to a handler parameter.
///
/// # Example
///
/// ```rust
/// use gantry_core::{ExtractionError, ExtractionSource};
/// use http::StatusCode;
///
/// let err = ExtractionError::missing(ExtractionSource::Header, "Token");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.field(), Some("Token"));
/// assert!(err.to_string().contains("Token"));
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionError {
    extraction_source: ExtractionSource,
    kind: ExtractionErrorKind,
    field: Option<String>,
    message: String,
}

impl ExtractionError {
    /// A required value is missing.
    #[must_use]
    pub fn missing(source: ExtractionSource, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::Missing,
            message: format!("missing required {source} parameter: {field}"),
            field: Some(field),
        }
    }

    /// A value could not be converted to its declared type.
    #[must_use]
    pub fn invalid_type(
        source: ExtractionSource,
        field: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let details = details.into();
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::InvalidType,
            message: format!("invalid {source} parameter '{field}': {details}"),
            field: Some(field),
        }
    }

    /// Structured data could not be decoded.
    #[must_use]
    pub fn deserialization_failed(
        source: ExtractionSource,
        field: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let error = error.into();
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::DeserializationFailed,
            message: format!("failed to decode {source} for '{field}': {error}"),
            field: Some(field),
        }
    }

    /// Body binding was attempted for a verb that carries no body.
    #[must_use]
    pub fn method_not_allowed(field: impl Into<String>, method: &http::Method) -> Self {
        let field = field.into();
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::MethodNotAllowed,
            message: format!(
                "body parameter '{field}' requires POST or PUT, request used {method}"
            ),
            field: Some(field),
        }
    }

    /// The body is larger than allowed.
    #[must_use]
    pub fn payload_too_large(max_size: usize, actual_size: usize) -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::PayloadTooLarge,
            message: format!("payload too large: max {max_size} bytes, got {actual_size} bytes"),
            field: None,
        }
    }

    /// A multipart upload could not be parsed.
    #[must_use]
    pub fn malformed_upload(details: impl Into<String>) -> Self {
        Self {
            extraction_source: ExtractionSource::File,
            kind: ExtractionErrorKind::MalformedUpload,
            message: format!("malformed multipart upload: {}", details.into()),
            field: None,
        }
    }

    /// An error with an explicit status code.
    #[must_use]
    pub fn custom(
        source: ExtractionSource,
        status: StatusCode,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::Custom(status),
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Where the value was being read from.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        self.extraction_source
    }

    /// The error classification.
    #[must_use]
    pub fn kind(&self) -> ExtractionErrorKind {
        self.kind
    }

    /// The offending parameter name, when known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status used when this error is written as a response.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ExtractionErrorKind::Missing
            | ExtractionErrorKind::InvalidType
            | ExtractionErrorKind::DeserializationFailed
            | ExtractionErrorKind::MalformedUpload => StatusCode::BAD_REQUEST,
            ExtractionErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ExtractionErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractionErrorKind::Custom(status) => status,
        }
    }

    /// Machine-readable code for the error envelope.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            ExtractionErrorKind::Missing => "MISSING_PARAMETER",
            ExtractionErrorKind::InvalidType => "INVALID_PARAMETER",
            ExtractionErrorKind::DeserializationFailed => "DESERIALIZATION_FAILED",
            ExtractionErrorKind::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ExtractionErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ExtractionErrorKind::MalformedUpload => "MALFORMED_UPLOAD",
            ExtractionErrorKind::Custom(_) => "EXTRACTION_FAILED",
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExtractionError {}

/// Configuration errors detected while registering routes.
///
/// These are programming errors; building a pipeline that produces one
/// fails and the application must not start.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The handler's custom parameter count disagrees with the descriptors.
    #[error(
        "handler for [{path}] declares {expected} custom parameter(s) but {registered} descriptor(s) were registered"
    )]
    ArityMismatch {
        /// Route path.
        path: String,
        /// Custom parameters declared by the handler signature.
        expected: usize,
        /// Descriptors supplied at registration.
        registered: usize,
    },

    /// A descriptor's source cannot feed the parameter's type.
    #[error(
        "parameter #{position} '{name}' of [{path}] is bound from {source_kind} but has type {type_name}"
    )]
    IncompatibleSource {
        /// Route path.
        path: String,
        /// Zero-based position among custom parameters.
        position: usize,
        /// Descriptor name.
        name: String,
        /// Descriptor source.
        source_kind: String,
        /// Declared Rust type.
        type_name: &'static str,
    },

    /// The handler declares a parameter type that can never be bound.
    #[error("parameter #{position} of [{path}] has unsupported type {type_name}")]
    UnsupportedParameter {
        /// Route path.
        path: String,
        /// Zero-based position in the handler signature.
        position: usize,
        /// Declared Rust type.
        type_name: &'static str,
    },

    /// The route path is not a valid template.
    #[error("invalid route path: {0}")]
    InvalidPath(#[from] gantry_router::PatternError),
}

/// Error returned by a handler as the second element of its result.
///
/// Defaults to `500 Internal Server Error` unless a status is chosen.
///
/// # Example
///
/// ```rust
/// use gantry_core::HandlerError;
/// use http::StatusCode;
///
/// let err = HandlerError::new("user not found").with_status(StatusCode::NOT_FOUND);
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(err.message(), "user not found");
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    status: StatusCode,
    code: String,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl HandlerError {
    /// Creates a 500 error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "HANDLER_ERROR".to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a 400 error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_status(StatusCode::BAD_REQUEST)
            .with_code("BAD_REQUEST")
    }

    /// Creates a 404 error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_status(StatusCode::NOT_FOUND)
            .with_code("NOT_FOUND")
    }

    /// Creates a 500 error wrapping a source error.
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(message).with_code("INTERNAL_ERROR")
        }
    }

    /// Overrides the response status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Overrides the machine-readable code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Response status.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &str {
        &self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts to the wire envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(&self.code, &self.message)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
            ..Self::new(String::new())
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<ExtractionError> for HandlerError {
    fn from(err: ExtractionError) -> Self {
        Self::new(err.message())
            .with_status(err.status_code())
            .with_code(err.error_code())
    }
}

impl From<std::convert::Infallible> for HandlerError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// The assembled argument list does not fit the handler.
///
/// Binding plans are validated at registration, so this only surfaces when
/// a custom argument resolver returns values of the wrong type.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Fewer arguments than parameters.
    #[error("missing argument at position {0}")]
    MissingArgument(usize),
    /// An argument could not be downcast to the parameter's type.
    #[error("argument at position {position} is not a {expected}")]
    TypeMismatch {
        /// Zero-based parameter position.
        position: usize,
        /// Expected Rust type.
        expected: &'static str,
    },
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorEnvelope {
    /// Builds an envelope from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
