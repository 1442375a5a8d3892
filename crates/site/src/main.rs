//! Drone Capital Site - marketing pages and investor portal on port 3000.
//!
//! Markdown content pages are loaded once at startup. Investor sessions use
//! backend auth; portal actions go through the functions service.
//!
//! # Security
//!
//! Holds only the backend anon key. The service key lives in the functions
//! service and the admin binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::path::Path;

use drone_backend::telemetry;
use drone_site::config::SiteConfig;
use drone_site::content::ContentStore;
use drone_site::state::AppState;

#[tokio::main]
async fn main() {
    let config = SiteConfig::from_env().expect("Failed to load configuration");
    let _telemetry = telemetry::init(
        "drone_site=info,drone_backend=info,tower_http=debug",
        sentry::release_name!(),
        &config.sentry,
    );

    let content =
        ContentStore::load(Path::new(drone_site::CONTENT_DIR)).expect("Failed to load content");
    let addr = config.socket_addr();
    let state = AppState::new(config, content).expect("Failed to create application state");

    let app = drone_site::app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("site listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the auth rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(telemetry::shutdown_signal())
    .await
    .expect("Server error");
}
