//! Parameter descriptors.
//!
//! A [`ParamDescriptor`] says where one handler argument comes from and
//! whether its absence is an error. Descriptors are positionally aligned
//! with the handler's custom parameters; the response writer and request
//! context parameters are never described.

use std::fmt;

/// The single source a parameter is bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// Query string, then form body, then posted multipart field.
    QueryOrForm,
    /// An HTTP header.
    Header,
    /// A `{name}` segment of a templated route.
    PathVariable,
    /// The decoded request body.
    Body,
    /// One or more multipart file uploads.
    File,
    /// A struct bound field by field.
    ValueObject,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::QueryOrForm => "query-or-form",
            Self::Header => "header",
            Self::PathVariable => "path-variable",
            Self::Body => "body",
            Self::File => "file",
            Self::ValueObject => "value-object",
        };
        f.write_str(name)
    }
}

/// Metadata for one field of a value-object parameter.
///
/// # Example
///
/// ```rust
/// use gantry_core::FieldDescriptor;
///
/// let field = FieldDescriptor::new("userAgent").named("User-Agent").header();
/// assert_eq!(field.name(), "User-Agent");
/// assert!(field.is_header());
///
/// let field = FieldDescriptor::new("PageSize");
/// assert_eq!(field.name(), "pagesize");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    field: String,
    name: String,
    header: bool,
    required: bool,
}

impl FieldDescriptor {
    /// Describes the struct field `field`; the lookup name defaults to the
    /// lower-cased field name.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.to_lowercase(),
            field,
            header: false,
            required: false,
        }
    }

    /// Overrides the lookup name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reads the field from a header instead of query/form data.
    #[must_use]
    pub fn header(mut self) -> Self {
        self.header = true;
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Struct field name used as the key when deserializing.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Request lookup name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the value comes from a header.
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.header
    }

    /// Whether absence is an error.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Field metadata for a struct bound as a value object.
///
/// Implementors are deserialized from the collected `(field, value)` pairs,
/// so field names returned here must match the serde field names.
///
/// ```rust
/// use gantry_core::{FieldDescriptor, ValueObject};
///
/// #[derive(serde::Deserialize)]
/// struct Paging {
///     page: u32,
///     size: u32,
/// }
///
/// impl ValueObject for Paging {
///     fn fields() -> Vec<FieldDescriptor> {
///         vec![FieldDescriptor::new("page").required(), FieldDescriptor::new("size")]
///     }
/// }
/// ```
pub trait ValueObject {
    /// Describes each bindable field.
    fn fields() -> Vec<FieldDescriptor>;
}

/// Describes one custom handler parameter.
///
/// # Example
///
/// ```rust
/// use gantry_core::{ParamDescriptor, ParamSource};
///
/// let token = ParamDescriptor::header("Token");
/// assert_eq!(token.source(), ParamSource::Header);
/// assert!(token.is_required());
///
/// let page = ParamDescriptor::param("page").optional();
/// assert!(!page.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    name: String,
    required: bool,
    source: ParamSource,
    fields: Vec<FieldDescriptor>,
}

impl ParamDescriptor {
    /// Creates a descriptor with an explicit source. Required by default.
    #[must_use]
    pub fn new(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            required: true,
            source,
            fields: Vec::new(),
        }
    }

    /// A required query/form parameter.
    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::QueryOrForm)
    }

    /// A required header.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Header)
    }

    /// A path variable. Always required.
    #[must_use]
    pub fn path_variable(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::PathVariable)
    }

    /// The request body.
    #[must_use]
    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Body)
    }

    /// A multipart file field.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::File)
    }

    /// A value object. Its fields are filled in from the parameter type at
    /// registration.
    #[must_use]
    pub fn value_object(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::new(name, ParamSource::ValueObject)
        }
    }

    /// Marks the parameter as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets whether the parameter is required.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Replaces the value-object field list.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    /// Lookup key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether absence is an error.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Where the value comes from.
    #[must_use]
    pub fn source(&self) -> ParamSource {
        self.source
    }

    /// Value-object fields; empty for other sources.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_source() {
        assert_eq!(ParamDescriptor::param("q").source(), ParamSource::QueryOrForm);
        assert_eq!(ParamDescriptor::header("h").source(), ParamSource::Header);
        assert_eq!(
            ParamDescriptor::path_variable("id").source(),
            ParamSource::PathVariable
        );
        assert_eq!(ParamDescriptor::body("b").source(), ParamSource::Body);
        assert_eq!(ParamDescriptor::file("f").source(), ParamSource::File);
        assert_eq!(
            ParamDescriptor::value_object("v").source(),
            ParamSource::ValueObject
        );
    }

    #[test]
    fn test_required_defaults() {
        assert!(ParamDescriptor::param("q").is_required());
        assert!(!ParamDescriptor::param("q").optional().is_required());
        assert!(!ParamDescriptor::value_object("v").is_required());
        assert!(ParamDescriptor::body("b").with_required(true).is_required());
    }

    #[test]
    fn test_field_descriptor_defaults_to_lowercase() {
        let field = FieldDescriptor::new("UserName");
        assert_eq!(field.field(), "UserName");
        assert_eq!(field.name(), "username");
        assert!(!field.is_header());
        assert!(!field.is_required());
    }

    #[test]
    fn test_field_descriptor_builder() {
        let field = FieldDescriptor::new("token").named("X-Token").header().required();
        assert_eq!(field.name(), "X-Token");
        assert!(field.is_header());
        assert!(field.is_required());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ParamSource::QueryOrForm.to_string(), "query-or-form");
        assert_eq!(ParamSource::PathVariable.to_string(), "path-variable");
    }
}
