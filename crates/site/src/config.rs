//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL`, `BACKEND_ANON_KEY` - see `drone_backend::config`
//! - `SITE_BASE_URL` - Public URL of the site
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `MIN_INVESTMENT_USD` - Smallest accepted purchase (default: 100)
//! - `TOKEN_PRICE_USD` - Price of one DRN token (default: 0.10)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};

use drone_backend::config::{get_env_or_default, get_required_env, parse_base_url, parse_env_or};
use drone_backend::{BackendConfig, ConfigError, SentryConfig};
use drone_core::{TokenPrice, UsdAmount};
use url::Url;

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: Url,
    /// Backend connection (anon key; the service key is never needed here)
    pub backend: BackendConfig,
    /// Smallest accepted purchase, checked before calling payment-api
    pub min_investment: UsdAmount,
    /// DRN price shown on the invest form
    pub token_price: TokenPrice,
    /// Error tracking
    pub sentry: SentryConfig,
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("SITE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_HOST".to_string(), e.to_string()))?;
        let port: u16 = parse_env_or("SITE_PORT", 3000)?;
        let base_url = parse_base_url("SITE_BASE_URL", &get_required_env("SITE_BASE_URL")?)?;

        let min_investment = UsdAmount::parse(&get_env_or_default("MIN_INVESTMENT_USD", "100"))
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MIN_INVESTMENT_USD".to_string(), e.to_string())
            })?;
        let token_price = TokenPrice::parse(&get_env_or_default("TOKEN_PRICE_USD", "0.10"))
            .map_err(|e| ConfigError::InvalidEnvVar("TOKEN_PRICE_USD".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            base_url,
            backend: BackendConfig::from_env()?,
            min_investment,
            token_price,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}
