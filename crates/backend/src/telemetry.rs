//! Logging, error tracking, and shutdown shared by the server binaries.
//!
//! Sentry must be initialized before the tracing subscriber so the Sentry
//! layer sees a bound client; [`init`] does both in that order.

use std::borrow::Cow;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SentryConfig;

/// Output format of the fmt layer, chosen by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One flattened JSON object per event, for log shipping in production.
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else, or unset, is text.
    #[must_use]
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Keeps the Sentry client alive; drop it last to flush pending events.
#[must_use = "dropping the guard disables error tracking"]
pub struct TelemetryGuard {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Initialize Sentry (when a DSN is set) and the global tracing subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset. `release` is usually
/// `sentry::release_name!()` from the calling binary.
pub fn init(
    default_filter: &str,
    release: Option<Cow<'static, str>>,
    sentry_config: &SentryConfig,
) -> TelemetryGuard {
    let sentry = sentry_config.dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release,
                environment: sentry_config.environment.clone().map(Cow::Owned),
                sample_rate: sentry_config.sample_rate,
                traces_sample_rate: sentry_config.traces_sample_rate,
                attach_stacktrace: true,
                // User context is attached explicitly after sign-in
                send_default_pii: false,
                ..Default::default()
            },
        ))
    });

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let format = LogFormat::from_value(std::env::var("LOG_FORMAT").ok().as_deref());
    let json_layer = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (format == LogFormat::Text).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry.is_some() {
        tracing::info!("Sentry initialized");
    }
    TelemetryGuard { _sentry: sentry }
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Resolve on Ctrl+C or SIGTERM.
///
/// A signal that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
