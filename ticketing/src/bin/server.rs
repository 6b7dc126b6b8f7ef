//! Ticketing HTTP server
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Starts the Prometheus exporter
//! - Connects the configured store, gateway and notifier
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! # Local development (in-memory store, mock gateway, console email)
//! cargo run --bin server
//!
//! # Against Paystack and PostgreSQL
//! GATEWAY_BACKEND=http PAYSTACK_SECRET_KEY=sk_live_... \
//! STORE_BACKEND=postgres DATABASE_URL=postgres://... cargo run --bin server
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use ticketing::server::build_router;
use ticketing::{Config, TicketingApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},sqlx=warn", config.server.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ticketing server...");

    config.validate()?;
    tracing::info!(
        gateway = ?config.gateway.backend,
        store = ?config.store.backend,
        email = ?config.email.provider,
        "Configuration loaded"
    );

    // Metrics
    let metrics_addr: SocketAddr =
        format!("{}:{}", config.server.metrics_host, config.server.metrics_port).parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    ticketing::metrics::register_business_metrics();
    tracing::info!(%metrics_addr, "Metrics exporter listening");

    let app = TicketingApp::new(&config).await?;
    let router = build_router(app.state());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Ticketing server listening");

    // The shutdown timeout starts when the signal arrives, not at startup
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let drain_deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut server => result??,
        () = drain_deadline => {
            tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out"
            );
            server.abort();
        },
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
