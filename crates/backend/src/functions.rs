//! Serverless function invocation and the response envelope they share.
//!
//! Every function answers with `{success, data?, error?, message?}`. The same
//! [`Envelope`] type is used by the functions service to build responses and
//! by the web crates to read them.

use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::{BackendClient, Credential};
use crate::error::BackendError;

/// The JSON body every function returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful response carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    /// A successful response with a human-readable note.
    #[must_use]
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// A failed response.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

impl BackendClient {
    /// Invoke `function` at `path` with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Returns the envelope's error message as [`BackendError::Api`] (or
    /// `Unauthorized`/`NotFound` for 401/404), or any transport failure.
    #[instrument(skip(self, body, credential), fields(function = %function, path = %path))]
    pub async fn invoke<B, T>(
        &self,
        function: &str,
        path: &str,
        method: Method,
        body: Option<&B>,
        credential: Credential<'_>,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.functions_endpoint(function, path)?;
        let mut request = self.request(method, url, credential)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        read_envelope(request.send().await?).await
    }

    /// Invoke `function` at `path` with a GET and query parameters.
    ///
    /// # Errors
    ///
    /// See [`BackendClient::invoke`].
    #[instrument(skip(self, query, credential), fields(function = %function, path = %path))]
    pub async fn invoke_get<T: DeserializeOwned>(
        &self,
        function: &str,
        path: &str,
        query: &[(&str, &str)],
        credential: Credential<'_>,
    ) -> Result<T, BackendError> {
        let mut url = self.functions_endpoint(function, path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        let response = self.request(Method::GET, url, credential)?.send().await?;
        read_envelope(response).await
    }

    /// Invoke `function` at `path` with a multipart form body.
    ///
    /// # Errors
    ///
    /// See [`BackendClient::invoke`].
    #[instrument(skip(self, form, credential), fields(function = %function, path = %path))]
    pub async fn invoke_multipart<T: DeserializeOwned>(
        &self,
        function: &str,
        path: &str,
        form: reqwest::multipart::Form,
        credential: Credential<'_>,
    ) -> Result<T, BackendError> {
        let url = self.functions_endpoint(function, path)?;
        let response = self
            .request(Method::POST, url, credential)?
            .multipart(form)
            .send()
            .await?;
        read_envelope(response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(BackendError::Parse(e.to_string())),
        Err(_) => {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }
    };

    if status.is_success() && envelope.success {
        return envelope
            .data
            .ok_or_else(|| BackendError::Parse("function response has no data".to_string()));
    }

    let message = envelope
        .error
        .or(envelope.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(match status.as_u16() {
        401 => BackendError::Unauthorized(message),
        404 => BackendError::NotFound(message),
        code if status.is_success() => BackendError::Api {
            status: code.max(400),
            message,
        },
        code => BackendError::Api {
            status: code,
            message,
        },
    })
}
