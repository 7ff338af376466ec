//! Handler abstraction.
//!
//! Any `Fn` whose parameters implement [`HandlerParam`] and whose return
//! type implements [`IntoReturns`] is a [`Handler`]. At registration the
//! handler's parameter list is read once through [`Handler::params`] and
//! turned into a binding plan; at request time resolved arguments are boxed,
//! passed through [`Callable::invoke`] and downcast back to the declared
//! types.
//!
//! Two parameter types are reserved for transport values and may appear at
//! any position: [`ResponseWriter`] and [`RequestContext`]. Every other
//! parameter is a custom parameter and needs a [`ParamDescriptor`].
//!
//! ```
//! use gantry_core::{Body, Handler, HandlerError, Json};
//!
//! #[derive(serde::Deserialize, serde::Serialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! fn create(token: String, user: Body<User>) -> Result<Json<User>, HandlerError> {
//!     if token.is_empty() {
//!         return Err(HandlerError::bad_request("no token"));
//!     }
//!     Ok(Json(user.into_inner()))
//! }
//!
//! fn params_of<H: Handler<A>, A>(_: &H) -> usize {
//!     H::params().len()
//! }
//! assert_eq!(params_of(&create), 2);
//! ```

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::error;

use crate::descriptor::{FieldDescriptor, ParamDescriptor, ParamSource, ValueObject};
use crate::error::{ExtractionError, ExtractionSource, HandlerError, InvokeError};
use crate::fields;
use crate::upload::MultipartFile;
use crate::{RequestContext, ResponseWriter};

/// A type-erased argument ready to be passed to a handler.
pub type BoxedArg = Box<dyn Any + Send>;

/// Converts a resolved [`Argument`] into the boxed parameter value.
pub type Binder = fn(Argument, &ParamDescriptor) -> Result<BoxedArg, ExtractionError>;

/// The kind of value a custom parameter type can be bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single text value converted to a scalar.
    Scalar,
    /// Decoded structured body data.
    Structured,
    /// One uploaded file.
    File,
    /// All files uploaded under one field.
    Files,
    /// A struct bound field by field.
    ValueObject,
}

impl Shape {
    /// Whether a descriptor source can feed this shape.
    #[must_use]
    pub fn accepts(self, source: ParamSource) -> bool {
        matches!(
            (source, self),
            (
                ParamSource::QueryOrForm | ParamSource::Header | ParamSource::PathVariable,
                Self::Scalar
            ) | (ParamSource::Body, Self::Structured)
                | (ParamSource::File, Self::File | Self::Files)
                | (ParamSource::ValueObject, Self::ValueObject)
        )
    }
}

/// Where a handler parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A custom parameter described by a [`ParamDescriptor`].
    Custom(Shape),
    /// The live response writer.
    Response,
    /// The live request context.
    Request,
    /// A type that cannot be bound, such as an optional transport value.
    Unsupported,
}

/// Raw request data resolved for one custom parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Nothing was found.
    Absent,
    /// A text value from a header, path segment, query or form.
    Text(String),
    /// A decoded structured body.
    Structured(Value),
    /// Uploaded files for one field.
    Files(Vec<MultipartFile>),
    /// `(field, value)` pairs collected for a value object.
    Fields(Vec<(String, String)>),
}

impl Argument {
    /// Returns true for [`Argument::Absent`], empty text and empty file lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Text(text) => text.is_empty(),
            Self::Files(files) => files.is_empty(),
            Self::Structured(_) | Self::Fields(_) => false,
        }
    }
}

fn source_of(descriptor: &ParamDescriptor) -> ExtractionSource {
    match descriptor.source() {
        ParamSource::QueryOrForm | ParamSource::ValueObject => ExtractionSource::Query,
        ParamSource::Header => ExtractionSource::Header,
        ParamSource::PathVariable => ExtractionSource::Path,
        ParamSource::Body => ExtractionSource::Body,
        ParamSource::File => ExtractionSource::File,
    }
}

/// A type usable as a handler parameter.
pub trait HandlerParam: Sized + Send + 'static {
    /// Where values of this type come from.
    fn slot() -> Slot;

    /// Converts a resolved argument into this type.
    fn from_argument(argument: Argument, descriptor: &ParamDescriptor)
        -> Result<Self, ExtractionError>;

    /// Field metadata for value-object parameters.
    fn fields() -> Option<Vec<FieldDescriptor>> {
        None
    }
}

macro_rules! impl_scalar_param {
    ($($ty:ty),* $(,)?) => {$(
        impl HandlerParam for $ty {
            fn slot() -> Slot {
                Slot::Custom(Shape::Scalar)
            }

            fn from_argument(
                argument: Argument,
                descriptor: &ParamDescriptor,
            ) -> Result<Self, ExtractionError> {
                match argument {
                    Argument::Text(text) if !text.is_empty() => {
                        text.trim().parse::<$ty>().map_err(|e| {
                            ExtractionError::invalid_type(
                                source_of(descriptor),
                                descriptor.name(),
                                format!("expected {}: {e}", stringify!($ty)),
                            )
                        })
                    }
                    _ => Ok(<$ty>::default()),
                }
            }
        }
    )*};
}

impl_scalar_param!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

impl HandlerParam for String {
    fn slot() -> Slot {
        Slot::Custom(Shape::Scalar)
    }

    fn from_argument(argument: Argument, _: &ParamDescriptor) -> Result<Self, ExtractionError> {
        match argument {
            Argument::Text(text) => Ok(text),
            _ => Ok(Self::new()),
        }
    }
}

impl HandlerParam for bool {
    fn slot() -> Slot {
        Slot::Custom(Shape::Scalar)
    }

    fn from_argument(
        argument: Argument,
        descriptor: &ParamDescriptor,
    ) -> Result<Self, ExtractionError> {
        match argument {
            Argument::Text(text) if !text.is_empty() => match text.trim() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => Ok(true),
                "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" => Ok(false),
                other => Err(ExtractionError::invalid_type(
                    source_of(descriptor),
                    descriptor.name(),
                    format!("expected bool, got '{other}'"),
                )),
            },
            _ => Ok(false),
        }
    }
}

/// `None` when the value is absent or empty.
///
/// Transport values are always present, so `Option<ResponseWriter>` and
/// `Option<RequestContext>` report [`Slot::Unsupported`] and fail
/// registration.
impl<T: HandlerParam> HandlerParam for Option<T> {
    fn slot() -> Slot {
        match T::slot() {
            Slot::Response | Slot::Request => Slot::Unsupported,
            slot => slot,
        }
    }

    fn from_argument(
        argument: Argument,
        descriptor: &ParamDescriptor,
    ) -> Result<Self, ExtractionError> {
        if argument.is_empty() {
            return Ok(None);
        }
        T::from_argument(argument, descriptor).map(Some)
    }

    fn fields() -> Option<Vec<FieldDescriptor>> {
        T::fields()
    }
}

/// A parameter decoded from the structured request body.
///
/// `T` may be any deserializable type: a struct, a map or a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body<T>(pub T);

impl<T> Body<T> {
    /// Unwraps the decoded value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Body<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Body<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> HandlerParam for Body<T> {
    fn slot() -> Slot {
        Slot::Custom(Shape::Structured)
    }

    fn from_argument(
        argument: Argument,
        descriptor: &ParamDescriptor,
    ) -> Result<Self, ExtractionError> {
        match argument {
            Argument::Structured(value) => serde_json::from_value(value).map(Body).map_err(|e| {
                ExtractionError::deserialization_failed(
                    ExtractionSource::Body,
                    descriptor.name(),
                    e.to_string(),
                )
            }),
            _ => Err(ExtractionError::missing(ExtractionSource::Body, descriptor.name())),
        }
    }
}

/// A struct bound field by field from headers, query and form values.
///
/// Declared fields that are absent and not required take their type's zero
/// value, like top-level scalars do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bind<T>(pub T);

impl<T> Bind<T> {
    /// Unwraps the bound value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Bind<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned + ValueObject + Send + 'static> HandlerParam for Bind<T> {
    fn slot() -> Slot {
        Slot::Custom(Shape::ValueObject)
    }

    fn from_argument(
        argument: Argument,
        descriptor: &ParamDescriptor,
    ) -> Result<Self, ExtractionError> {
        let pairs = match argument {
            Argument::Fields(pairs) => pairs,
            _ => Vec::new(),
        };
        let declared = if descriptor.fields().is_empty() {
            T::fields()
        } else {
            descriptor.fields().to_vec()
        };
        let absent = declared
            .into_iter()
            .map(|field| field.field().to_string())
            .filter(|field| !pairs.iter().any(|(name, _)| name == field))
            .collect();
        fields::from_fields(pairs, absent).map(Bind).map_err(|e| {
            ExtractionError::invalid_type(ExtractionSource::Query, descriptor.name(), e.to_string())
        })
    }

    fn fields() -> Option<Vec<FieldDescriptor>> {
        Some(T::fields())
    }
}

impl HandlerParam for MultipartFile {
    fn slot() -> Slot {
        Slot::Custom(Shape::File)
    }

    fn from_argument(
        argument: Argument,
        descriptor: &ParamDescriptor,
    ) -> Result<Self, ExtractionError> {
        match argument {
            Argument::Files(files) => files
                .into_iter()
                .next()
                .ok_or_else(|| ExtractionError::missing(ExtractionSource::File, descriptor.name())),
            _ => Err(ExtractionError::missing(ExtractionSource::File, descriptor.name())),
        }
    }
}

impl HandlerParam for Box<MultipartFile> {
    fn slot() -> Slot {
        Slot::Custom(Shape::File)
    }

    fn from_argument(
        argument: Argument,
        descriptor: &ParamDescriptor,
    ) -> Result<Self, ExtractionError> {
        MultipartFile::from_argument(argument, descriptor).map(Box::new)
    }
}

impl HandlerParam for Vec<MultipartFile> {
    fn slot() -> Slot {
        Slot::Custom(Shape::Files)
    }

    fn from_argument(argument: Argument, _: &ParamDescriptor) -> Result<Self, ExtractionError> {
        match argument {
            Argument::Files(files) => Ok(files),
            _ => Ok(Vec::new()),
        }
    }
}

fn transport_misuse(descriptor: &ParamDescriptor) -> ExtractionError {
    ExtractionError::custom(
        source_of(descriptor),
        http::StatusCode::INTERNAL_SERVER_ERROR,
        descriptor.name(),
        "transport parameters are injected, not resolved",
    )
}

impl HandlerParam for ResponseWriter {
    fn slot() -> Slot {
        Slot::Response
    }

    fn from_argument(_: Argument, descriptor: &ParamDescriptor) -> Result<Self, ExtractionError> {
        Err(transport_misuse(descriptor))
    }
}

impl HandlerParam for RequestContext {
    fn slot() -> Slot {
        Slot::Request
    }

    fn from_argument(_: Argument, descriptor: &ParamDescriptor) -> Result<Self, ExtractionError> {
        Err(transport_misuse(descriptor))
    }
}

/// Registration-time description of one handler parameter.
#[derive(Clone)]
pub struct ParamSpec {
    slot: Slot,
    type_name: &'static str,
    binder: Binder,
    fields: Option<Vec<FieldDescriptor>>,
}

fn bind_boxed<T: HandlerParam>(
    argument: Argument,
    descriptor: &ParamDescriptor,
) -> Result<BoxedArg, ExtractionError> {
    T::from_argument(argument, descriptor).map(|value| Box::new(value) as BoxedArg)
}

impl ParamSpec {
    /// Describes parameter type `T`.
    #[must_use]
    pub fn of<T: HandlerParam>() -> Self {
        Self {
            slot: T::slot(),
            type_name: type_name::<T>(),
            binder: bind_boxed::<T>,
            fields: T::fields(),
        }
    }

    /// Where the value comes from.
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The declared Rust type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Converts a resolved argument into the boxed value.
    #[must_use]
    pub fn binder(&self) -> Binder {
        self.binder
    }

    /// Value-object field metadata, if any.
    #[must_use]
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        self.fields.as_deref()
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("slot", &self.slot)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// One value produced by a handler.
#[derive(Debug)]
pub enum ReturnValue {
    /// A payload; `None` encodes a nil value.
    Payload(Option<Value>),
    /// An error slot; `None` means no error.
    Error(Option<HandlerError>),
}

/// The ordered values a handler returned.
#[derive(Debug, Default)]
pub struct Returns(Vec<ReturnValue>);

impl Returns {
    /// No return values.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Appends a payload value.
    #[must_use]
    pub fn payload(mut self, value: Option<Value>) -> Self {
        self.0.push(ReturnValue::Payload(value));
        self
    }

    /// Appends an error value.
    #[must_use]
    pub fn error(mut self, error: Option<HandlerError>) -> Self {
        self.0.push(ReturnValue::Error(error));
        self
    }

    /// Number of returned values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the handler returned nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes into the ordered values.
    #[must_use]
    pub fn into_values(self) -> Vec<ReturnValue> {
        self.0
    }
}

/// Conversion from a handler's return type into [`Returns`].
pub trait IntoReturns {
    /// Performs the conversion.
    fn into_returns(self) -> Returns;
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(|e| {
        error!(error = %e, type_name = type_name::<T>(), "failed to serialize handler result");
        HandlerError::internal("failed to serialize handler result", e)
    })
}

fn single<T: Serialize + ?Sized>(value: &T) -> Returns {
    match to_payload(value) {
        Ok(value) => Returns::none().payload(Some(value)),
        Err(err) => Returns::none().payload(None).error(Some(err)),
    }
}

impl IntoReturns for () {
    fn into_returns(self) -> Returns {
        Returns::none()
    }
}

impl IntoReturns for Returns {
    fn into_returns(self) -> Returns {
        self
    }
}

macro_rules! impl_into_returns {
    ($($ty:ty),* $(,)?) => {$(
        impl IntoReturns for $ty {
            fn into_returns(self) -> Returns {
                single(&self)
            }
        }
    )*};
}

impl_into_returns!(
    String, &'static str, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64, Value
);

impl<T: Serialize> IntoReturns for Vec<T> {
    fn into_returns(self) -> Returns {
        single(&self)
    }
}

impl<K: Serialize, V: Serialize> IntoReturns for HashMap<K, V> {
    fn into_returns(self) -> Returns {
        single(&self)
    }
}

impl<K: Serialize, V: Serialize> IntoReturns for BTreeMap<K, V> {
    fn into_returns(self) -> Returns {
        single(&self)
    }
}

impl<T: Serialize> IntoReturns for Option<T> {
    fn into_returns(self) -> Returns {
        match self {
            Some(value) => single(&value),
            None => Returns::none().payload(None),
        }
    }
}

/// `Ok` and `Err` map to the `(payload, error)` pair; the error takes
/// precedence when present.
impl<T: Serialize, E: Into<HandlerError>> IntoReturns for Result<T, E> {
    fn into_returns(self) -> Returns {
        match self {
            Ok(value) => match to_payload(&value) {
                Ok(value) => Returns::none().payload(Some(value)).error(None),
                Err(err) => Returns::none().payload(None).error(Some(err)),
            },
            Err(err) => Returns::none().payload(None).error(Some(err.into())),
        }
    }
}

/// A serializable handler result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<T: Serialize> IntoReturns for Json<T> {
    fn into_returns(self) -> Returns {
        single(&self.0)
    }
}

/// A function usable as a request handler.
///
/// Implemented for every `Fn` of up to eight [`HandlerParam`] arguments
/// returning an [`IntoReturns`] type.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Describes each declared parameter in order.
    fn params() -> Vec<ParamSpec>;

    /// Calls the handler with boxed arguments in declaration order.
    fn call(&self, args: Vec<BoxedArg>) -> Result<Returns, InvokeError>;
}

fn take<T: 'static>(
    args: &mut std::vec::IntoIter<BoxedArg>,
    position: &mut usize,
) -> Result<T, InvokeError> {
    let at = *position;
    *position += 1;
    let arg = args.next().ok_or(InvokeError::MissingArgument(at))?;
    arg.downcast::<T>()
        .map(|value| *value)
        .map_err(|_| InvokeError::TypeMismatch {
            position: at,
            expected: type_name::<T>(),
        })
}

macro_rules! impl_handler {
    ($($T:ident),*) => {
        impl<F, R, $($T,)*> Handler<($($T,)*)> for F
        where
            F: Fn($($T),*) -> R + Send + Sync + 'static,
            R: IntoReturns,
            $($T: HandlerParam,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$(ParamSpec::of::<$T>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<BoxedArg>) -> Result<Returns, InvokeError> {
                let mut args = args.into_iter();
                let mut position = 0usize;
                $(let $T = take::<$T>(&mut args, &mut position)?;)*
                Ok((self)($($T),*).into_returns())
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

/// An object-safe, type-erased handler stored in a route entry.
pub trait Callable: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// Declared parameters in order.
    fn params(&self) -> &[ParamSpec];

    /// Invokes the handler with boxed arguments in declaration order.
    fn invoke(&self, args: Vec<BoxedArg>) -> Result<Returns, InvokeError>;
}

/// Adapts a [`Handler`] into a [`Callable`].
pub struct BoxedHandler<H, Args> {
    handler: H,
    name: String,
    params: Vec<ParamSpec>,
    _args: PhantomData<fn() -> Args>,
}

impl<H: Handler<Args>, Args> BoxedHandler<H, Args> {
    /// Wraps `handler`, naming it after its type.
    pub fn new(handler: H) -> Self {
        Self::named(handler, type_name::<H>())
    }

    /// Wraps `handler` with an explicit display name.
    pub fn named(handler: H, name: impl Into<String>) -> Self {
        Self {
            handler,
            name: name.into(),
            params: H::params(),
            _args: PhantomData,
        }
    }
}

impl<H: Handler<Args>, Args: 'static> Callable for BoxedHandler<H, Args> {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn invoke(&self, args: Vec<BoxedArg>) -> Result<Returns, InvokeError> {
        self.handler.call(args)
    }
}

impl<H, Args> fmt::Debug for BoxedHandler<H, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedHandler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
