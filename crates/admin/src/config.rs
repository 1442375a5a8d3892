//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL`, `BACKEND_ANON_KEY`, `BACKEND_SERVICE_KEY` - see `drone_backend::config`
//! - `ADMIN_BASE_URL` - Public URL for the back-office
//! - `ADMIN_LOGIN_EMAIL` - Email accepted at step one of the login
//! - `ADMIN_LOGIN_PASSWORD` - Password accepted at step one (high entropy)
//! - `ADMIN_LOGIN_CODE` - Six-digit code accepted at step two
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_SESSION_TTL_MINUTES` - Signed-in session lifetime (default: 60)
//! - `ADMIN_DASHBOARD_TIMEOUT_SECS` - Dashboard stats deadline (default: 8)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use drone_backend::config::{
    get_env_or_default, get_optional_env, get_required_env, get_validated_secret,
    parse_base_url, parse_env_or,
};
use drone_backend::{BackendConfig, ConfigError, SentryConfig};
use drone_core::Email;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Number of digits in the step-two login code.
pub const LOGIN_CODE_LENGTH: usize = 6;

/// Everything the back-office needs at startup.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL for the back-office
    pub base_url: Url,
    /// Backend connection (service key required)
    pub backend: BackendConfig,
    /// The fixed credentials checked by the two-step login
    pub login: LoginCredentials,
    /// How long a completed login stays valid
    pub session_ttl: chrono::Duration,
    /// Deadline for the dashboard stats call
    pub dashboard_timeout: Duration,
    /// Error tracking
    pub sentry: SentryConfig,
    /// Serve HTTPS directly when set
    pub tls: Option<TlsConfig>,
}

/// Credentials for the two-step admin login.
///
/// Implements `Debug` manually to redact the password and code.
#[derive(Clone)]
pub struct LoginCredentials {
    pub email: Email,
    pub password: SecretString,
    pub code: SecretString,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("code", &"[REDACTED]")
            .finish()
    }
}

impl LoginCredentials {
    fn from_env() -> Result<Self, ConfigError> {
        let email = Email::parse(&get_required_env("ADMIN_LOGIN_EMAIL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_LOGIN_EMAIL".to_string(), e.to_string()))?;
        let password = get_validated_secret("ADMIN_LOGIN_PASSWORD")?;
        let code = SecretString::from(get_required_env("ADMIN_LOGIN_CODE")?.trim().to_string());
        validate_login_code(&code, "ADMIN_LOGIN_CODE")?;

        Ok(Self {
            email,
            password,
            code,
        })
    }
}

/// Certificate chain and key for serving HTTPS without a proxy.
#[derive(Clone)]
pub struct TlsConfig {
    pub cert_pem: String,
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    /// Both variables or neither; one without the other is an error.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_pair(get_optional_env("ADMIN_TLS_CERT"), get_optional_env("ADMIN_TLS_KEY"))
    }

    fn from_pair(cert: Option<String>, key: Option<String>) -> Result<Option<Self>, ConfigError> {
        match (cert, key) {
            (None, None) => Ok(None),
            (Some(cert_pem), Some(key)) => Ok(Some(Self {
                cert_pem,
                key_pem: SecretString::from(key),
            })),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("ADMIN_TLS_KEY".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("ADMIN_TLS_CERT".to_string())),
        }
    }
}

impl AdminConfig {
    /// Read the environment, after loading `.env` when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or malformed variable, a login
    /// password that looks like a placeholder, or a code that is not six
    /// digits.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host: IpAddr = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string())
            })?;
        let port: u16 = parse_env_or("ADMIN_PORT", 3001)?;
        let base_url = parse_base_url("ADMIN_BASE_URL", &get_required_env("ADMIN_BASE_URL")?)?;

        let ttl_minutes: i64 = parse_env_or("ADMIN_SESSION_TTL_MINUTES", 60)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_SESSION_TTL_MINUTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let dashboard_timeout_secs: u64 = parse_env_or("ADMIN_DASHBOARD_TIMEOUT_SECS", 8)?;

        Ok(Self {
            host,
            port,
            base_url,
            backend: BackendConfig::from_env()?.require_service_key()?,
            login: LoginCredentials::from_env()?,
            session_ttl: chrono::Duration::minutes(ttl_minutes),
            dashboard_timeout: Duration::from_secs(dashboard_timeout_secs),
            sentry: SentryConfig::from_env()?,
            tls: TlsConfig::from_env()?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https" || self.tls.is_some()
    }
}

/// Check that a login code is exactly six ASCII digits.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` naming `var_name`.
pub fn validate_login_code(code: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let code = code.expose_secret();
    if code.len() == LOGIN_CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must be exactly {LOGIN_CODE_LENGTH} digits"),
        ))
    }
}
