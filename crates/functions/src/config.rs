//! Functions service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL`, `BACKEND_ANON_KEY`, `BACKEND_SERVICE_KEY` - see `drone_backend::config`
//! - `CARD_CHECKOUT_URL` - Hosted checkout page of the card processor
//! - `PAYMENT_WEBHOOK_SECRET` - Shared secret for card processor webhooks
//!
//! ## Optional
//! - `FUNCTIONS_HOST` - Bind address (default: 127.0.0.1)
//! - `FUNCTIONS_PORT` - Listen port (default: 3002)
//! - `CRYPTO_CONFIRMATION_DELAY_MS` - Simulated confirmation wait (default: 3000)
//! - `TOKEN_PRICE_USD` - Price of one DRN token (default: 0.10)
//! - `MIN_INVESTMENT_USD` - Smallest accepted purchase (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use drone_backend::config::{
    get_env_or_default, get_required_env, get_validated_secret, parse_base_url, parse_env_or,
};
use drone_backend::{BackendConfig, ConfigError, SentryConfig};
use drone_core::{TokenPrice, UsdAmount};
use secrecy::SecretString;
use url::Url;

/// Functions service configuration.
///
/// Implements `Debug` manually to redact the webhook secret.
#[derive(Clone)]
pub struct FunctionsConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Backend connection (service key required)
    pub backend: BackendConfig,
    /// Hosted checkout page investors are redirected to
    pub card_checkout_url: Url,
    /// HMAC key for webhook signatures
    pub webhook_secret: SecretString,
    /// How long crypto verification pretends to wait for confirmations
    pub crypto_confirmation_delay: Duration,
    /// Current DRN price
    pub token_price: TokenPrice,
    /// Smallest accepted purchase
    pub min_investment: UsdAmount,
    /// Error tracking
    pub sentry: SentryConfig,
}

impl std::fmt::Debug for FunctionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionsConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("backend", &self.backend)
            .field("card_checkout_url", &self.card_checkout_url.as_str())
            .field("webhook_secret", &"[REDACTED]")
            .field("crypto_confirmation_delay", &self.crypto_confirmation_delay)
            .field("token_price", &self.token_price)
            .field("min_investment", &self.min_investment)
            .field("sentry", &self.sentry)
            .finish()
    }
}

impl FunctionsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("FUNCTIONS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FUNCTIONS_HOST".to_string(), e.to_string()))?;
        let port: u16 = parse_env_or("FUNCTIONS_PORT", 3002)?;

        let backend = BackendConfig::from_env()?.require_service_key()?;
        let card_checkout_url =
            parse_base_url("CARD_CHECKOUT_URL", &get_required_env("CARD_CHECKOUT_URL")?)?;
        let webhook_secret = get_validated_secret("PAYMENT_WEBHOOK_SECRET")?;
        let delay_ms: u64 = parse_env_or("CRYPTO_CONFIRMATION_DELAY_MS", 3000)?;

        Ok(Self {
            host,
            port,
            backend,
            card_checkout_url,
            webhook_secret,
            crypto_confirmation_delay: Duration::from_millis(delay_ms),
            token_price: token_price_from_env()?,
            min_investment: min_investment_from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// `TOKEN_PRICE_USD`, default `0.10`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for a non-positive or malformed price.
pub fn token_price_from_env() -> Result<TokenPrice, ConfigError> {
    TokenPrice::parse(&get_env_or_default("TOKEN_PRICE_USD", "0.10"))
        .map_err(|e| ConfigError::InvalidEnvVar("TOKEN_PRICE_USD".to_string(), e.to_string()))
}

/// `MIN_INVESTMENT_USD`, default `100`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for a non-positive or malformed amount.
pub fn min_investment_from_env() -> Result<UsdAmount, ConfigError> {
    UsdAmount::parse(&get_env_or_default("MIN_INVESTMENT_USD", "100"))
        .map_err(|e| ConfigError::InvalidEnvVar("MIN_INVESTMENT_USD".to_string(), e.to_string()))
}
