//! OpenTelemetry observability infrastructure.
//!
//! Provides:
//! - Provider bootstrap with an explicit, passed-down [`provider::Telemetry`] handle
//! - Span wrapper with typed attribute helpers
//! - Export filter that keeps only failed spans
//! - Checked metric instrument registry
//! - Log subscriber setup bridged into the tracer

pub mod attributes;
pub mod filter;
pub mod metrics;
pub mod provider;
pub mod resource;
pub mod span;
pub mod tracing;
