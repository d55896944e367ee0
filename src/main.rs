//! Faultline: a demo HTTP service that exports only failed request spans.
//!
//! # Usage
//!
//! ```bash
//! faultline --port 8080 --otel-endpoint localhost:4317 --error-rate 30
//! ```
//!
//! Environment variables can also be used:
//! - `PORT`: Port to listen on
//! - `OTEL_SERVICE_NAME`: Service name reported to the collector
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP/gRPC collector endpoint
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::sync::Arc;

use anyhow::Context as _;
use faultline::config::Config;
use faultline::observability::provider::normalize_endpoint;
use faultline::observability::tracing::init_tracing;
use faultline::server::run_server;
use faultline::Telemetry;
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
   ___          _ _   _ _
  | __|_ _ _  _| | |_| (_)_ _  ___
  | _/ _` | || | |  _| | | ' \/ -_)
  |_|\__,_|\_,_|_|\__|_|_|_||_\___|

  Faultline v{} - error-only span export demo

  Configuration:
    Address:     {}:{}
    Service:     {}
    Collector:   {}
    Paths:       {}
    Error Rate:  {}%
    Log Level:   {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.host,
        config.port,
        config.service_name,
        config.otel_endpoint,
        config.paths.join(","),
        config.error_rate,
        config.log_level
    );
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating shutdown...");
                    }
                }
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl+C only");
            }
        }
    }

    match ctrl_c.await {
        Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Without telemetry the service has nothing to demonstrate
    let telemetry = Telemetry::init(config.telemetry())
        .with_context(|| format!("failed to initialize telemetry for {}", config.otel_endpoint))?;
    let telemetry = Arc::new(telemetry);

    // Initialize logging, bridging `tracing` spans through the same pipeline
    init_tracing(&config.log_level, Some(telemetry.tracer().clone()));
    tracing::info!(
        endpoint = %normalize_endpoint(&config.otel_endpoint),
        "OTLP exporters configured"
    );
    telemetry.install_global();

    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let served = run_server(config, Arc::clone(&telemetry), shutdown_rx).await;

    // Flush telemetry last so spans from the final requests still ship
    let flushed = telemetry.shutdown().await;

    served.map_err(|e| anyhow::anyhow!(e)).context("server failed")?;
    flushed.context("failed to flush telemetry")?;

    tracing::info!("Faultline shutdown complete");
    Ok(())
}
