//! Reading multipart upload forms.
//!
//! The site, the admin panel, and the functions service all accept a form
//! with a few text fields and one part named `file` before handing the bytes
//! to [`storage`](crate::storage).

use std::collections::HashMap;

use axum::extract::Multipart;
use thiserror::Error;

use crate::storage::sanitize_file_name;

/// Why an upload form was rejected. The messages are shown to users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    Malformed(String),

    #[error("Choose a file to upload")]
    MissingFile,

    #[error("The file is empty")]
    EmptyFile,

    #[error("The file is larger than {} MB", .max_bytes / (1024 * 1024))]
    TooLarge { max_bytes: usize },

    #[error("{0} is required")]
    MissingField(String),
}

/// The `file` part of an upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Sanitized, safe to use in an object key.
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields plus the file of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl UploadForm {
    /// Drain `multipart`, keeping trimmed text fields and the part named
    /// `file`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`] for a malformed body, an empty file, or one
    /// over `max_bytes`.
    pub async fn read(mut multipart: Multipart, max_bytes: usize) -> Result<Self, UploadError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::Malformed(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "file" {
                let file_name = sanitize_file_name(field.file_name().unwrap_or("upload"));
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Malformed(e.body_text()))?;
                if bytes.is_empty() {
                    return Err(UploadError::EmptyFile);
                }
                if bytes.len() > max_bytes {
                    return Err(UploadError::TooLarge { max_bytes });
                }
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| UploadError::Malformed(e.body_text()))?;
                form.fields.insert(name, value.trim().to_string());
            }
        }

        Ok(form)
    }

    /// A form with only text fields, as [`read`](Self::read) would leave it.
    #[must_use]
    pub fn from_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).trim().to_string()))
                .collect(),
            file: None,
        }
    }

    /// A text field, `None` when missing or blank.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// A required, non-blank text field.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::MissingField`] naming the field.
    pub fn require(&self, name: &str) -> Result<&str, UploadError> {
        self.field(name)
            .ok_or_else(|| UploadError::MissingField(name.to_string()))
    }

    /// Take the uploaded file.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::MissingFile`] when no `file` part was sent.
    pub fn take_file(&mut self) -> Result<UploadedFile, UploadError> {
        self.file.take().ok_or(UploadError::MissingFile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{Request, header};

    use super::*;

    const BOUNDARY: &str = "drone-upload-boundary";

    async fn multipart(body: String) -> Multipart {
        let request = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn file_part(file_name: &str, contents: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             {contents}\r\n"
        )
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"\r\n\r\n\
             {value}\r\n"
        )
    }

    #[tokio::test]
    async fn test_read_keeps_fields_and_sanitizes_file_name() {
        let body = format!(
            "{}{}--{BOUNDARY}--\r\n",
            text_part("title", "  Q3 statement "),
            file_part("../Signed (1).pdf", "%PDF-1.4"),
        );

        let mut form = UploadForm::read(multipart(body).await, 1024).await.unwrap();
        assert_eq!(form.field("title"), Some("Q3 statement"));

        let file = form.take_file().unwrap();
        assert_eq!(file.file_name, "Signed__1_.pdf");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.bytes, b"%PDF-1.4");
        assert_eq!(form.take_file().unwrap_err(), UploadError::MissingFile);
    }

    #[tokio::test]
    async fn test_read_rejects_empty_and_oversized_files() {
        let empty = format!("{}--{BOUNDARY}--\r\n", file_part("a.pdf", ""));
        assert_eq!(
            UploadForm::read(multipart(empty).await, 1024).await.unwrap_err(),
            UploadError::EmptyFile
        );

        let large = format!("{}--{BOUNDARY}--\r\n", file_part("a.pdf", "0123456789"));
        assert_eq!(
            UploadForm::read(multipart(large).await, 4).await.unwrap_err(),
            UploadError::TooLarge { max_bytes: 4 }
        );
    }

    #[test]
    fn test_blank_fields_read_as_missing() {
        let form = UploadForm::from_fields(&[("title", "  "), ("category", "legal")]);
        assert_eq!(form.field("title"), None);
        assert_eq!(form.field("category"), Some("legal"));
        assert_eq!(
            form.require("title").unwrap_err(),
            UploadError::MissingField("title".to_string())
        );
        assert_eq!(form.require("category").unwrap(), "legal");
    }

    #[test]
    fn test_too_large_names_the_limit() {
        let err = UploadError::TooLarge {
            max_bytes: 25 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "The file is larger than 25 MB");
    }
}
