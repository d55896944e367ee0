//! HTTP server setup and lifecycle.
//!
//! Configures the axum server with:
//! - The demo handler on every configured path
//! - Graceful shutdown on the watch signal
//! - A bounded grace period for in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Config;
use crate::observability::metrics::AppMetrics;
use crate::observability::provider::Telemetry;
use crate::service::{handle_request, AppState};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Create the router answering on `paths`.
///
/// Paths missing a leading slash get one; duplicates are ignored.
pub fn create_router(state: AppState, paths: &[String]) -> Router {
    let mut routes: Vec<String> = Vec::with_capacity(paths.len());
    for path in paths {
        let path = if path.starts_with('/') {
            path.clone()
        } else {
            format!("/{path}")
        };
        if !routes.contains(&path) {
            routes.push(path);
        }
    }

    let mut router = Router::new();
    for path in &routes {
        router = router.route(path, any(handle_request));
    }
    router.with_state(state)
}

/// Run the Faultline HTTP server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `telemetry` - Telemetry handle the handlers record into
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down. Telemetry is left running so the
/// caller can flush it last.
pub async fn run_server(
    config: Config,
    telemetry: Arc<Telemetry>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    serve(listener, config, telemetry, shutdown_rx).await
}

/// Serve on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    telemetry: Arc<Telemetry>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    let metrics = Arc::new(AppMetrics::new(telemetry.registry())?);
    let state = AppState::new(telemetry, metrics, config.error_rate);
    let app = create_router(state, &config.paths);

    tracing::info!(
        address = %listener.local_addr()?,
        paths = ?config.paths,
        error_rate = config.error_rate,
        "Starting Faultline HTTP server"
    );

    let mut signal_rx = shutdown_rx.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = signal_rx.changed().await;
                tracing::info!("Shutdown signal received, stopping server");
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            tracing::info!("Server stopped");
            return Ok(());
        }
        _ = shutdown_rx.changed() => {}
    }

    let grace = config.grace_period();
    drain(&mut server, grace).await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait up to `grace` for in-flight requests, then abort the rest.
async fn drain(
    server: &mut tokio::task::JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<(), BoxError> {
    match tokio::time::timeout(grace, &mut *server).await {
        Ok(result) => {
            result??;
            Ok(())
        }
        Err(_) => {
            tracing::warn!(?grace, "Grace period elapsed, aborting in-flight requests");
            server.abort();
            Ok(())
        }
    }
}
