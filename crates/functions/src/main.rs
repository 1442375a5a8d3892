//! Drone Capital Functions - contract, KYC, payment and token handlers.
//!
//! This binary serves the function endpoints on port 3002. The site and
//! admin call it with the investor's (or admin's) bearer token.
//!
//! # Security
//!
//! Holds the backend service key. Run it behind the same network boundary
//! as the backend and never expose the key to browsers.

#![cfg_attr(not(test), forbid(unsafe_code))]

use drone_backend::telemetry;
use drone_functions::config::FunctionsConfig;
use drone_functions::state::AppState;

#[tokio::main]
async fn main() {
    let config = FunctionsConfig::from_env().expect("Failed to load configuration");
    let _telemetry = telemetry::init(
        "drone_functions=info,drone_backend=info,tower_http=debug",
        sentry::release_name!(),
        &config.sentry,
    );

    let addr = config.socket_addr();
    let state = AppState::new(config).expect("Failed to create application state");

    let app = drone_functions::app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("functions listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await
        .expect("Server error");
}
