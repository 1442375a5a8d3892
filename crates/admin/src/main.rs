//! Drone Capital Admin - back-office panel on port 3001.
//!
//! **Run only behind a private network or with TLS configured.** The binary
//! holds the backend service key, which bypasses row-level security.
//! Sign-in is two-step against fixed credentials and every mutation is
//! written to the audit log.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use drone_admin::config::AdminConfig;
use drone_admin::state::AppState;
use drone_backend::telemetry;
use secrecy::ExposeSecret;

/// Time in-flight requests get to finish on HTTPS shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    // Must be installed before any TLS operation
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AdminConfig::from_env().expect("Failed to load configuration");
    let _telemetry = telemetry::init(
        "drone_admin=info,drone_backend=info,tower_http=debug",
        sentry::release_name!(),
        &config.sentry,
    );

    let addr = config.socket_addr();
    let tls = config.tls.clone();
    let state = AppState::new(config).expect("Failed to create application state");

    let app = drone_admin::app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let Some(tls) = tls else {
        tracing::info!("admin listening on http://{addr}");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind to address");
        axum::serve(listener, app)
            .with_graceful_shutdown(telemetry::shutdown_signal())
            .await
            .expect("Server error");
        return;
    };

    let rustls_config = RustlsConfig::from_pem(
        tls.cert_pem.into_bytes(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await
    .expect("Failed to load TLS certificates");

    // axum_server drains through its handle rather than a shutdown future
    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            telemetry::shutdown_signal().await;
            handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        }
    });

    tracing::info!("admin listening on https://{addr}");
    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("Server error");
}
