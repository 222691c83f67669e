//! Process startup: logging, `.env` loading and the HTTP server with its background tasks.

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::{app_state::AppState, outbox};

/// Log to stdout, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

/// Load `.env` when present. Real environment variables take precedence.
pub fn init_env() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Failed to load environment file"),
    }
}

/// Start the outbox relay, then serve `app` until Ctrl+C or SIGTERM.
pub async fn bootstrap(name: &str, app: Router<AppState>, state: AppState) -> Result<()> {
    let messaging = &state.config.messaging;
    match &messaging.rabbitmq_url {
        Some(url) => {
            tracing::info!(exchange = %messaging.exchange, "Outbox relay started");
            tokio::spawn(outbox::run_relay(
                state.clone(),
                url.clone(),
                messaging.exchange.clone(),
                messaging.poll_interval,
            ));
        }
        None => tracing::info!("RABBITMQ_URL not set, outbox relay disabled"),
    }

    let addr = state.config.server.socket_addr();
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("{} listening on http://{}", name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("{} stopped", name);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutting down");
}
