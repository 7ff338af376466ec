//! `multipart/form-data` parsing.
//!
//! The request body is already buffered, so the whole form is read in one
//! pass and kept in memory: text parts become `(name, value)` fields and
//! parts with a file name become [`MultipartFile`]s.

use std::io;

use bytes::Bytes;
use gantry_core::{ExtractionError, MultipartFile, RequestContext};
use http::{header, HeaderMap};

/// Default cap on a multipart body (32 MiB).
pub const DEFAULT_MAX_MEMORY: usize = 32 << 20;

/// Default cap on the number of parts.
pub const DEFAULT_MAX_PARTS: usize = 256;

/// Limits applied while parsing a multipart body.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Maximum number of parts.
    pub max_parts: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_MEMORY,
            max_parts: DEFAULT_MAX_PARTS,
        }
    }
}

impl MultipartConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the maximum number of parts.
    #[must_use]
    pub fn max_parts(mut self, count: usize) -> Self {
        self.max_parts = count;
        self
    }
}

/// Returns true if the request declares a multipart body.
#[must_use]
pub fn is_multipart(request: &RequestContext) -> bool {
    request.content_type() == Some(mime::MULTIPART_FORM_DATA.essence_str())
}

/// A fully read multipart form.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    files: Vec<MultipartFile>,
}

impl MultipartForm {
    /// Parses a buffered multipart body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the body exceeds the cap, and
    /// `MalformedUpload` if the content type has no boundary or the body
    /// cannot be parsed.
    pub fn parse(
        headers: &HeaderMap,
        body: Bytes,
        config: &MultipartConfig,
    ) -> Result<Self, ExtractionError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ExtractionError::malformed_upload("missing Content-Type"))?;
        let boundary = multer::parse_boundary(content_type)
            .map_err(|e| ExtractionError::malformed_upload(format!("invalid boundary: {e}")))?;

        if body.len() > config.max_body_size {
            return Err(ExtractionError::payload_too_large(
                config.max_body_size,
                body.len(),
            ));
        }

        let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
        let multipart = multer::Multipart::new(stream, boundary);
        futures::executor::block_on(read_parts(multipart, config.max_parts))
    }

    /// Parses the request body if it is multipart, or returns an empty form.
    ///
    /// # Errors
    ///
    /// See [`MultipartForm::parse`].
    pub fn from_request(
        request: &RequestContext,
        config: &MultipartConfig,
    ) -> Result<Self, ExtractionError> {
        if !is_multipart(request) {
            return Ok(Self::default());
        }
        Self::parse(request.headers(), request.body().clone(), config)
    }

    /// The first non-empty text value posted under `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        crate::form::first_value(&self.fields, name)
    }

    /// All text fields in order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Files posted under `name`, in order.
    #[must_use]
    pub fn files(&self, name: &str) -> Vec<MultipartFile> {
        self.files
            .iter()
            .filter(|file| file.field_name() == name)
            .cloned()
            .collect()
    }

    /// Every uploaded file.
    #[must_use]
    pub fn all_files(&self) -> &[MultipartFile] {
        &self.files
    }
}

async fn read_parts(
    mut multipart: multer::Multipart<'static>,
    max_parts: usize,
) -> Result<MultipartForm, ExtractionError> {
    let mut form = MultipartForm::default();
    let mut count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ExtractionError::malformed_upload(e.to_string()))?
    {
        count += 1;
        if count > max_parts {
            return Err(ExtractionError::malformed_upload(format!(
                "too many parts (max {max_parts})"
            )));
        }

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(ToString::to_string);
        let headers = field.headers().clone();
        let data = field
            .bytes()
            .await
            .map_err(|e| ExtractionError::malformed_upload(format!("failed to read part '{name}': {e}")))?;

        match file_name {
            Some(file_name) => {
                let mut file = MultipartFile::new(name, data)
                    .with_file_name(file_name)
                    .with_headers(headers);
                if let Some(content_type) = content_type {
                    file = file.with_content_type(content_type);
                }
                form.files.push(file);
            }
            None => {
                let value = String::from_utf8_lossy(&data).into_owned();
                form.fields.push((name, value));
            }
        }
    }

    Ok(form)
}
