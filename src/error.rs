//! Error type for the telemetry layer.

use std::time::Duration;

use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

use crate::observability::metrics::InstrumentKind;

/// Errors raised while building, feeding or tearing down telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// An OTLP exporter could not be constructed (bad endpoint, missing runtime).
    #[error("failed to build OTLP {signal} exporter for {endpoint}: {source}")]
    ExporterBuild {
        signal: &'static str,
        endpoint: String,
        #[source]
        source: ExporterBuildError,
    },

    /// An instrument with the same name but a different shape already exists.
    #[error(
        "instrument `{name}` is already registered as {existing} ({existing_unit:?}), \
         cannot register it as {requested} ({requested_unit:?})"
    )]
    InstrumentConflict {
        name: String,
        existing: InstrumentKind,
        existing_unit: String,
        requested: InstrumentKind,
        requested_unit: String,
    },

    #[error("invalid instrument name `{0}`")]
    InvalidInstrumentName(String),

    #[error("histogram `{0}` bucket boundaries must be finite and strictly ascending")]
    InvalidBoundaries(String),

    /// One or both pipelines failed to flush. Both are always attempted.
    #[error(
        "telemetry flush failed (traces: {}, metrics: {})",
        describe(.traces),
        describe(.metrics)
    )]
    Flush {
        traces: Option<OTelSdkError>,
        metrics: Option<OTelSdkError>,
    },

    /// One or both providers failed to shut down. Both are always attempted.
    #[error(
        "telemetry shutdown failed (traces: {}, metrics: {})",
        describe(.traces),
        describe(.metrics)
    )]
    Shutdown {
        traces: Option<OTelSdkError>,
        metrics: Option<OTelSdkError>,
    },

    #[error("telemetry shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("telemetry shutdown task panicked")]
    ShutdownPanicked,
}

fn describe(result: &Option<OTelSdkError>) -> String {
    match result {
        Some(e) => e.to_string(),
        None => "ok".to_string(),
    }
}
