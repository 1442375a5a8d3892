//! Object storage: upload, download, remove, and signed URLs.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::client::{BackendClient, Credential, check_status, read_json};
use crate::error::BackendError;

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
///
/// Leading dots are dropped so a name can never address a parent directory.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Join path segments into an object key.
#[must_use]
pub fn object_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

impl BackendClient {
    fn object_url(&self, prefix: &str, bucket: &str, path: &str) -> Result<url::Url, BackendError> {
        let mut segments = vec!["storage", "v1", "object"];
        if !prefix.is_empty() {
            segments.push(prefix);
        }
        segments.push(bucket);
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(&segments)
    }

    /// Store `bytes` at `bucket/path`.
    ///
    /// # Errors
    ///
    /// Returns error if the upload is rejected (e.g. the object exists and
    /// `upsert` is false).
    #[instrument(skip(self, bytes, credential), fields(size = bytes.len()))]
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
        credential: Credential<'_>,
    ) -> Result<(), BackendError> {
        let url = self.object_url("", bucket, path)?;
        let response = self
            .request(Method::POST, url, credential)?
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// Fetch the object at `bucket/path`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if there is no such object.
    #[instrument(skip(self, credential))]
    pub async fn download_object(
        &self,
        bucket: &str,
        path: &str,
        credential: Credential<'_>,
    ) -> Result<Vec<u8>, BackendError> {
        let url = self.object_url("", bucket, path)?;
        let response = self.request(Method::GET, url, credential)?.send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Remove objects from `bucket`. Missing objects are not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, credential))]
    pub async fn remove_objects(
        &self,
        bucket: &str,
        paths: &[&str],
        credential: Credential<'_>,
    ) -> Result<(), BackendError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.endpoint(&["storage", "v1", "object", bucket])?;
        let response = self
            .request(Method::DELETE, url, credential)?
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// Create a time-limited download URL for `bucket/path`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if there is no such object.
    #[instrument(skip(self, credential))]
    pub async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
        credential: Credential<'_>,
    ) -> Result<String, BackendError> {
        let url = self.object_url("sign", bucket, path)?;
        let response = self
            .request(Method::POST, url, credential)?
            .json(&json!({ "expiresIn": expires_in.as_secs() }))
            .send()
            .await?;
        let signed: SignedUrlResponse = read_json(response).await?;

        if signed.signed_url.starts_with("http://") || signed.signed_url.starts_with("https://") {
            return Ok(signed.signed_url);
        }
        let relative = signed.signed_url.trim_start_matches('/');
        Ok(format!(
            "{}/storage/v1/{relative}",
            self.base_url().as_str().trim_end_matches('/')
        ))
    }
}
