//! Faultline: an OpenTelemetry bootstrap that ships only failed spans.
//!
//! Every request is traced and metered locally, but the span exporter is
//! wrapped in a filter so that only spans in an error state leave the
//! process. Successful traffic still shows up in the metrics.
//!
//! # Architecture
//!
//! - **Explicit handle**: [`Telemetry`] owns the tracer and meter providers
//!   and is passed down to whoever records telemetry
//! - **Typed attributes**: [`AttributeValue`] is a closed set of value types
//! - **Filtered export**: [`FilteringExporter`] forwards only the spans its
//!   [`SpanPredicate`] retains, [`ErrorsOnly`] by default
//! - **Checked instruments**: [`MetricRegistry`] rejects conflicting
//!   instrument registrations instead of corrupting aggregation
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration for the demo service
//! - [`error`]: Telemetry error type
//! - [`observability`]: Provider bootstrap, spans, export filter, metrics
//! - [`server`]: HTTP server setup and lifecycle
//! - [`service`]: Demo request handler

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // observability::metrics::MetricRegistry is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod config;
pub mod error;
pub mod observability;
pub mod server;
pub mod service;

pub use error::TelemetryError;
pub use observability::attributes::AttributeValue;
pub use observability::filter::{ErrorsOnly, FilteringExporter, SpanPredicate};
pub use observability::metrics::{AppMetrics, InstrumentKind, MetricRegistry};
pub use observability::provider::{Telemetry, TelemetryBuilder, TelemetryConfig};
pub use observability::span::{InstrumentedSpan, SpanIdentifiers};

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) request ID.
///
/// # Example
///
/// ```
/// let id = faultline::generate_request_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}
