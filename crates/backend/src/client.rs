//! Shared HTTP plumbing for the backend client.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Which key a request is made with.
///
/// `Anon` and `User` are subject to row-level security; `Service` bypasses it
/// and is only available where a service key is configured.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// The public anon key.
    Anon,
    /// A signed-in user's access token.
    User(&'a SecretString),
    /// The service-role key.
    Service,
}

/// Client for the backend's REST, auth, storage, and functions APIs.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
    functions_url: Url,
    anon_key: SecretString,
    service_key: Option<SecretString>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("functions_url", &self.inner.functions_url.as_str())
            .field("has_service_key", &self.has_service_key())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("drone-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url: config.url.clone(),
                functions_url: config.functions_url.clone(),
                anon_key: config.anon_key.clone(),
                service_key: config.service_key.clone(),
            }),
        })
    }

    /// Whether service-role requests are possible.
    #[must_use]
    pub fn has_service_key(&self) -> bool {
        self.inner.service_key.is_some()
    }

    /// The project base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Check that the REST API answers.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or rejects the key.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), BackendError> {
        let credential = if self.has_service_key() {
            Credential::Service
        } else {
            Credential::Anon
        };
        let url = self.endpoint(&["rest", "v1", ""])?;
        let response = self.request(Method::GET, url, credential)?.send().await?;
        check_status(response).await.map(|_| ())
    }

    /// Build `{base}/{segments...}`.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        append_segments(&self.inner.base_url, segments)
    }

    /// Build `{functions_url}/{function}/{path...}`.
    pub(crate) fn functions_endpoint(&self, function: &str, path: &str) -> Result<Url, BackendError> {
        let mut segments = vec![function];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        append_segments(&self.inner.functions_url, &segments)
    }

    /// Start a request carrying the `apikey` and bearer headers for `credential`.
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        credential: Credential<'_>,
    ) -> Result<RequestBuilder, BackendError> {
        let anon = self.inner.anon_key.expose_secret();
        let (apikey, bearer) = match credential {
            Credential::Anon => (anon, anon),
            Credential::User(token) => (anon, token.expose_secret()),
            Credential::Service => {
                let key = self
                    .inner
                    .service_key
                    .as_ref()
                    .ok_or(BackendError::MissingServiceKey)?
                    .expose_secret();
                (key, key)
            }
        };

        Ok(self
            .inner
            .http
            .request(method, url)
            .header("apikey", apikey)
            .bearer_auth(bearer))
    }
}

fn append_segments(base: &Url, segments: &[&str]) -> Result<Url, BackendError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| BackendError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn an error status into a [`BackendError`], passing successes through.
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    tracing::debug!(status = status.as_u16(), %message, "Backend returned an error");

    Err(match status.as_u16() {
        401 => BackendError::Unauthorized(message),
        404 => BackendError::NotFound(message),
        code => BackendError::Api {
            status: code,
            message,
        },
    })
}

/// Check the status and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Pull a human message out of the error bodies the backend returns.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::test_support::{ANON_KEY, SERVICE_KEY, client};
    use super::*;

    #[test]
    fn test_extract_error_message_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            extract_error_message(r#"{"message":"duplicate key"}"#).as_deref(),
            Some("duplicate key")
        );
        assert_eq!(extract_error_message("<html>"), None);
    }

    #[test]
    fn test_functions_endpoint_joins_path() {
        let client = client("http://127.0.0.1:9", false);
        let url = client.functions_endpoint("payment-api", "/crypto/verify").unwrap();
        assert_eq!(url.path(), "/functions/v1/payment-api/crypto/verify");
    }

    #[tokio::test]
    async fn test_service_credential_requires_key() {
        let client = client("http://127.0.0.1:9", false);
        let url = client.endpoint(&["rest", "v1", "profiles"]).unwrap();
        let result = client.request(Method::GET, url, Credential::Service);
        assert!(matches!(result, Err(BackendError::MissingServiceKey)));
    }

    #[tokio::test]
    async fn test_headers_per_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/"))
            .and(header("apikey", SERVICE_KEY))
            .and(header("authorization", format!("Bearer {SERVICE_KEY}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri(), true).ping().await.unwrap();

        let user_token = SecretString::from("user-access-token");
        let anon = client(&server.uri(), false);
        let request = anon
            .request(
                Method::GET,
                anon.endpoint(&["rest", "v1", "profiles"]).unwrap(),
                Credential::User(&user_token),
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers()["apikey"], ANON_KEY);
        assert_eq!(request.headers()["authorization"], "Bearer user-access-token");
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "JWT expired"})),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri(), false).ping().await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(ref m) if m == "JWT expired"));
    }
}
