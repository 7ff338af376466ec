//! Uploaded files.

use bytes::Bytes;
use http::HeaderMap;

/// One file part of a `multipart/form-data` request.
///
/// The content is held in memory; the body cap applied before parsing
/// bounds its size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartFile {
    field_name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    headers: HeaderMap,
    data: Bytes,
}

impl MultipartFile {
    /// Creates a file part.
    #[must_use]
    pub fn new(field_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            field_name: field_name.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Sets the client-supplied file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the part's content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the part headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The form field this file was posted under.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The client-supplied file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The part's content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The part headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// File contents.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for an empty file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
