//! Backend connection settings and the environment helpers shared by every
//! binary in the workspace.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Project URL (e.g., `https://abc123.backend.example`)
//! - `BACKEND_ANON_KEY` - Public (anon) API key
//!
//! ## Optional
//! - `BACKEND_SERVICE_KEY` - Service-role key (required by admin and functions)
//! - `BACKEND_FUNCTIONS_URL` - Functions base URL (default: `{BACKEND_URL}/functions/v1`)
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where the backend lives and which keys to present.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL
    pub url: Url,
    /// Public key sent as `apikey` on anonymous and user requests
    pub anon_key: SecretString,
    /// Service-role key, bypasses row-level security
    pub service_key: Option<SecretString>,
    /// Base URL for serverless functions
    pub functions_url: Url,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("functions_url", &self.functions_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl BackendConfig {
    /// Load backend settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a URL does
    /// not parse, or the service key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = parse_base_url("BACKEND_URL", &get_required_env("BACKEND_URL")?)?;
        let anon_key = SecretString::from(get_required_env("BACKEND_ANON_KEY")?);
        let service_key = get_optional_env("BACKEND_SERVICE_KEY")
            .map(|value| {
                validate_secret_strength(&value, "BACKEND_SERVICE_KEY")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;

        let functions_url = match get_optional_env("BACKEND_FUNCTIONS_URL") {
            Some(raw) => parse_base_url("BACKEND_FUNCTIONS_URL", &raw)?,
            None => default_functions_url(&url),
        };
        let timeout_secs: u64 = parse_env_or("BACKEND_TIMEOUT_SECS", 15)?;

        Ok(Self {
            url,
            anon_key,
            service_key,
            functions_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Fail unless a service key is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` for `BACKEND_SERVICE_KEY`.
    pub fn require_service_key(self) -> Result<Self, ConfigError> {
        if self.service_key.is_none() {
            return Err(ConfigError::MissingEnvVar("BACKEND_SERVICE_KEY".to_string()));
        }
        Ok(self)
    }
}

/// Error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN (tracking disabled when unset)
    pub dsn: Option<String>,
    /// Environment tag (e.g. production, staging)
    pub environment: Option<String>,
    /// Error event sample rate, 0.0 to 1.0
    pub sample_rate: f32,
    /// Performance trace sample rate, 0.0 to 1.0
    pub traces_sample_rate: f32,
}

impl SentryConfig {
    /// Load Sentry settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a sample rate is not a float.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: parse_env_or("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }
}

fn default_functions_url(base: &Url) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["functions", "v1"]);
    }
    url
}

/// Parse an `http(s)` base URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` naming `key` if the value is not an
/// absolute http or https URL.
pub fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http or https URL".to_string(),
        ));
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if unset or empty.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the value is set but does not parse.
pub fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Load and validate a secret from environment.
///
/// # Errors
///
/// Returns `ConfigError` if the variable is missing or fails validation.
pub fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` naming `var_name`.
pub fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
