//! `shopfront-api` server binary.
//!
//! Loads [`ApiConfig`] from the environment, connects to `PostgreSQL` and
//! serves the router from [`shopfront_api::app`] until Ctrl+C or SIGTERM.
//! Schema migrations are applied separately with `shop-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront_api::config::ApiConfig;
use shopfront_api::state::AppState;
use shopfront_api::{app, db};

const DEFAULT_LOG_FILTER: &str = "shopfront_api=info,tower_http=debug";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet
            eprintln!("shopfront-api: invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry first so the tracing layer has a client to report to
    let _sentry = init_sentry(&config);
    init_tracing();

    if let Err(e) = serve(config).await {
        tracing::error!(error = %e, "shopfront-api stopped");
        std::process::exit(1);
    }
}

async fn serve(config: ApiConfig) -> Result<(), BoxError> {
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    let pricing = &config.checkout;
    tracing::info!(
        tax_rate = %pricing.tax_rate,
        shipping_flat = %pricing.shipping_flat,
        free_shipping_threshold = %pricing.free_shipping_threshold,
        frontend = %config.frontend_url,
        google_sign_in = config.oauth.is_some(),
        "Configuration loaded"
    );

    let addr = config.socket_addr();
    let router = app(AppState::new(config, pool));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "shopfront-api listening");

    // Peer address feeds the rate limiter when no proxy header is present
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Start Sentry when a DSN is configured. Keep the guard alive for the
/// lifetime of the process.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

/// `RUST_LOG`-driven fmt output, with warnings and errors forwarded to Sentry
/// as events and lower levels kept as breadcrumbs.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let sentry_layer =
        sentry_tracing::layer().event_filter(|metadata: &tracing::Metadata<'_>| {
            match *metadata.level() {
                tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
                tracing::Level::INFO | tracing::Level::DEBUG => {
                    sentry_tracing::EventFilter::Breadcrumb
                }
                tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
            }
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections");
}
