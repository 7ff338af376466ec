//! Result resolution: turning handler return values into a response.

use gantry_core::{HandlerError, ResponseWriter, ReturnValue, Returns, RouteEntry};
use http::StatusCode;
use serde_json::Value;
use tracing::error;

/// What a handler's return values amount to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The handler declared no return value; nothing is written.
    Empty,
    /// A payload to write. `None` is a nil value.
    Payload(Option<Value>),
}

impl Resolution {
    /// The payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Payload(value) => value.as_ref(),
            Self::Empty => None,
        }
    }
}

/// Interprets and writes handler return values.
pub trait ResultResolver: Send + Sync {
    /// Interprets the returned values.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error, or an error if the return shape is
    /// not supported.
    fn resolve(&self, route: &RouteEntry, returns: Returns) -> Result<Resolution, HandlerError>;

    /// Writes a payload to the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    fn write(&self, payload: Option<&Value>, response: &ResponseWriter) -> Result<(), HandlerError>;
}

/// Writes payloads as JSON with `200 OK`.
///
/// | Returned values    | Outcome                                   |
/// |--------------------|-------------------------------------------|
/// | none               | nothing written                           |
/// | one                | written as the payload                    |
/// | payload, error     | the error if present, else the payload    |
/// | more than two      | error                                     |
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultResolver;

impl ResultResolver for JsonResultResolver {
    fn resolve(&self, route: &RouteEntry, returns: Returns) -> Result<Resolution, HandlerError> {
        let count = returns.len();
        let mut values = returns.into_values().into_iter();
        match (values.next(), values.next()) {
            (None, _) => Ok(Resolution::Empty),
            (Some(first), None) => single(first),
            (Some(_), Some(_)) if count > 2 => {
                error!(route = route.path(), handler = route.handler().name(), count, "too many return values");
                Err(HandlerError::new(format!(
                    "handler '{}' returned {count} values, support 2 results at most",
                    route.handler().name()
                )))
            }
            (Some(first), Some(second)) => match second {
                ReturnValue::Error(Some(err)) => Err(err),
                ReturnValue::Error(None) | ReturnValue::Payload(_) => single(first),
            },
        }
    }

    fn write(&self, payload: Option<&Value>, response: &ResponseWriter) -> Result<(), HandlerError> {
        response
            .write_json(StatusCode::OK, &payload)
            .map_err(|e| HandlerError::internal("failed to encode response", e))
    }
}

fn single(value: ReturnValue) -> Result<Resolution, HandlerError> {
    match value {
        ReturnValue::Payload(payload) => Ok(Resolution::Payload(payload)),
        ReturnValue::Error(Some(err)) => Err(err),
        ReturnValue::Error(None) => Ok(Resolution::Payload(None)),
    }
}
