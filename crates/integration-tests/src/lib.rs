//! Helpers for end-to-end tests against running Drone Capital services.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p drone-site &
//! cargo run -p drone-admin &
//! cargo run -p drone-functions &
//! cargo test -p drone-integration-tests -- --ignored
//! ```

use reqwest::Client;
use reqwest::redirect::Policy;

/// Which service a test talks to.
#[derive(Debug, Clone, Copy)]
pub enum Service {
    Site,
    Admin,
    Functions,
}

impl Service {
    /// Base URL from the environment, or the local default port.
    #[must_use]
    pub fn base_url(self) -> String {
        let _ = dotenvy::dotenv();
        let (var, default) = match self {
            Self::Site => ("SITE_BASE_URL", "http://localhost:3000"),
            Self::Admin => ("ADMIN_BASE_URL", "http://localhost:3001"),
            Self::Functions => ("FUNCTIONS_BASE_URL", "http://localhost:3002"),
        };
        std::env::var(var)
            .unwrap_or_else(|_| default.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

/// A client that keeps cookies and does not follow redirects.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialised.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Read a required variable for a test.
///
/// # Panics
///
/// Panics with the variable name when it is unset.
#[must_use]
pub fn require_env(name: &str) -> String {
    let _ = dotenvy::dotenv();
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set for this test"))
}
