//! Log subscriber setup.
//!
//! Configures structured logging with:
//! - Environment-based filter (via RUST_LOG)
//! - Console output with target, thread and source location
//! - An optional bridge that turns `tracing` spans into OpenTelemetry spans

use opentelemetry_sdk::trace::SdkTracer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging.
///
/// `log_level` is used as the filter when `RUST_LOG` is not set. When a
/// tracer is given, `tracing` spans are exported through it as well, and
/// so pass through the same export filter as hand-made spans.
///
/// # Arguments
///
/// * `log_level` - Fallback filter directive, e.g. `info`
/// * `tracer` - Tracer to bridge `tracing` spans into
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_tracing(log_level: &str, tracer: Option<SdkTracer>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},faultline=debug")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(log_level, "Logging initialized");
}

/// Initialize logging for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
