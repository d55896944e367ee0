//! Telemetry bootstrap.
//!
//! Wires together:
//! - The resource descriptor shared by traces and metrics
//! - A batching span processor over the error-only [`FilteringExporter`]
//! - A periodic metric reader feeding the OTLP metric exporter
//! - The [`MetricRegistry`] used to create instruments
//!
//! The result is a [`Telemetry`] handle owned by the application root and
//! passed to whatever records telemetry. Registering it as the process-wide
//! default is opt-in via [`Telemetry::install_global`].

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::http::HeaderMap;
use opentelemetry::global;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{Context, InstrumentationScope};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, Sampler, SdkTracer, SdkTracerProvider, SpanExporter,
};
use opentelemetry_sdk::Resource;

use super::filter::{ErrorsOnly, FilteringExporter, SpanPredicate};
use super::metrics::MetricRegistry;
use super::resource::{build_resource, DEFAULT_SERVICE_VERSION};
use super::span::InstrumentedSpan;
use crate::error::TelemetryError;

/// Settings for [`Telemetry`].
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// Reported as `deployment.environment` when set.
    pub environment: Option<String>,
    /// OTLP/gRPC collector, `host:port` or a full `http://` URL.
    pub collector_endpoint: String,
    /// Upper bound for a single export call.
    pub export_timeout: Duration,
    /// Spans buffered before new ones are dropped.
    pub max_queue_size: usize,
    /// Spans per export call. A full batch triggers an export early.
    pub max_export_batch_size: usize,
    /// Interval between span exports.
    pub scheduled_delay: Duration,
    /// Interval between metric collections.
    pub metric_interval: Duration,
    /// Window for flushing buffered data on shutdown.
    pub shutdown_timeout: Duration,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, collector_endpoint: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            collector_endpoint: collector_endpoint.into(),
            ..Self::default()
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "faultline".into(),
            service_version: DEFAULT_SERVICE_VERSION.into(),
            environment: None,
            collector_endpoint: "localhost:4317".into(),
            export_timeout: Duration::from_secs(30),
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(5),
            metric_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Prefix scheme-less endpoints with `http://`.
///
/// Plain `http` selects an insecure (non-TLS) gRPC channel.
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// Builder for [`Telemetry`], mainly for swapping exporters or the span filter.
#[derive(Debug)]
pub struct TelemetryBuilder<P = ErrorsOnly> {
    config: TelemetryConfig,
    predicate: P,
}

impl TelemetryBuilder<ErrorsOnly> {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            predicate: ErrorsOnly,
        }
    }
}

impl<P: SpanPredicate> TelemetryBuilder<P> {
    /// Replace the default error-only export filter.
    pub fn with_span_predicate<Q: SpanPredicate>(self, predicate: Q) -> TelemetryBuilder<Q> {
        TelemetryBuilder {
            config: self.config,
            predicate,
        }
    }

    /// Build with OTLP/gRPC exporters pointed at the configured collector.
    ///
    /// Must run inside a Tokio runtime: the gRPC channel spawns its
    /// connection task on it.
    pub fn build(self) -> Result<Telemetry, TelemetryError> {
        let endpoint = normalize_endpoint(&self.config.collector_endpoint);

        let spans = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .with_timeout(self.config.export_timeout)
            .build()
            .map_err(|source| TelemetryError::ExporterBuild {
                signal: "span",
                endpoint: endpoint.clone(),
                source,
            })?;

        let metrics = MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .with_timeout(self.config.export_timeout)
            .build()
            .map_err(|source| TelemetryError::ExporterBuild {
                signal: "metric",
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(self.build_with(spans, metrics))
    }

    /// Build around caller-supplied exporters.
    ///
    /// `spans` still sits behind the export filter.
    pub fn build_with<S, M>(self, spans: S, metrics: M) -> Telemetry
    where
        S: SpanExporter + 'static,
        M: PushMetricExporter,
    {
        let config = self.config;
        let resource = build_resource(
            &config.service_name,
            &config.service_version,
            config.environment.as_deref(),
        );

        let batch_config = BatchConfigBuilder::default()
            .with_max_queue_size(config.max_queue_size)
            .with_max_export_batch_size(config.max_export_batch_size)
            .with_scheduled_delay(config.scheduled_delay)
            .build();
        let processor = BatchSpanProcessor::builder(FilteringExporter::new(spans, self.predicate))
            .with_batch_config(batch_config)
            .build();

        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_sampler(Sampler::AlwaysOn)
            .with_span_processor(processor)
            .build();

        let reader = PeriodicReader::builder(metrics)
            .with_interval(config.metric_interval)
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource.clone())
            .with_reader(reader)
            .build();

        let scope = InstrumentationScope::builder(config.service_name.clone())
            .with_version(config.service_version.clone())
            .build();
        let tracer = tracer_provider.tracer_with_scope(scope.clone());
        let registry = MetricRegistry::new(meter_provider.meter_with_scope(scope));

        Telemetry {
            config,
            resource,
            tracer_provider,
            meter_provider,
            tracer,
            registry,
            propagator: TraceContextPropagator::new(),
            is_shutdown: AtomicBool::new(false),
        }
    }
}

/// Handle to the process's tracing and metrics pipelines.
#[derive(Debug)]
pub struct Telemetry {
    config: TelemetryConfig,
    resource: Resource,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    tracer: SdkTracer,
    registry: MetricRegistry,
    propagator: TraceContextPropagator,
    is_shutdown: AtomicBool,
}

impl Telemetry {
    /// Initialize telemetry exporting to the configured OTLP collector.
    ///
    /// An error here means the process cannot fulfil its observability
    /// contract; callers are expected to treat it as fatal.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        TelemetryBuilder::new(config).build()
    }

    pub fn builder(config: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder::new(config)
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    pub fn meter(&self) -> &Meter {
        self.registry.meter()
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Start a span as a child of whatever span `parent` carries.
    pub fn start_span(
        &self,
        parent: &Context,
        name: impl Into<Cow<'static, str>>,
    ) -> (Context, InstrumentedSpan) {
        InstrumentedSpan::start(&self.tracer, parent, name)
    }

    /// Extract a remote parent from W3C `traceparent`/`tracestate` headers.
    ///
    /// Returns an empty context when the headers carry none.
    pub fn extract_context(&self, headers: &HeaderMap) -> Context {
        self.propagator.extract(&HeaderExtractor(headers))
    }

    /// Register this pipeline as the process-wide default for libraries
    /// that only know about the global API.
    pub fn install_global(&self) {
        global::set_tracer_provider(self.tracer_provider.clone());
        global::set_meter_provider(self.meter_provider.clone());
        global::set_text_map_propagator(TraceContextPropagator::new());
        tracing::debug!("Installed global tracer and meter providers");
    }

    /// Export everything buffered so far.
    ///
    /// Blocks the calling thread until both pipelines have flushed. Metrics
    /// are flushed even when the trace flush fails, and failures are
    /// reported together.
    pub fn force_flush(&self) -> Result<(), TelemetryError> {
        let traces = self.tracer_provider.force_flush().err();
        let metrics = self.meter_provider.force_flush().err();

        if traces.is_none() && metrics.is_none() {
            Ok(())
        } else {
            tracing::warn!(?traces, ?metrics, "Telemetry flush failed");
            Err(TelemetryError::Flush { traces, metrics })
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Flush buffered data and release the exporters.
    ///
    /// Both pipelines are torn down even if one fails, and failures are
    /// reported together. Data not flushed within the configured shutdown
    /// window is dropped. Later calls return `Ok(())` without doing anything.
    pub async fn shutdown(&self) -> Result<(), TelemetryError> {
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            tracing::debug!("Telemetry already shut down");
            return Ok(());
        }

        let tracer_provider = self.tracer_provider.clone();
        let meter_provider = self.meter_provider.clone();
        let deadline = self.config.shutdown_timeout;

        // Provider shutdown blocks on the exporter threads.
        let teardown = tokio::task::spawn_blocking(move || {
            let traces = tracer_provider.shutdown().err();
            let metrics = meter_provider.shutdown().err();
            (traces, metrics)
        });

        let (traces, metrics) = match tokio::time::timeout(deadline, teardown).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Telemetry shutdown task failed");
                return Err(TelemetryError::ShutdownPanicked);
            }
            Err(_) => {
                tracing::error!(?deadline, "Telemetry shutdown timed out, dropping unflushed data");
                return Err(TelemetryError::ShutdownTimeout(deadline));
            }
        };

        if traces.is_none() && metrics.is_none() {
            tracing::info!("Telemetry shut down");
            Ok(())
        } else {
            Err(TelemetryError::Shutdown { traces, metrics })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.collector_endpoint, "localhost:4317");
        assert_eq!(config.export_timeout, Duration::from_secs(30));
        assert!(config.max_export_batch_size <= config.max_queue_size);
    }

    #[test]
    fn test_config_new_overrides_identity() {
        let config = TelemetryConfig::new("checkout", "collector:4317");
        assert_eq!(config.service_name, "checkout");
        assert_eq!(config.collector_endpoint, "collector:4317");
        assert_eq!(config.metric_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("localhost:4317"), "http://localhost:4317");
        assert_eq!(
            normalize_endpoint("http://collector:4317"),
            "http://collector:4317"
        );
        assert_eq!(
            normalize_endpoint("https://collector:4317"),
            "https://collector:4317"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_init_with_local_collector() {
        let telemetry = Telemetry::init(TelemetryConfig::new("demo-api-service", "localhost:4317"))
            .expect("exporters should build without connecting");

        assert!(!telemetry.is_shutdown());
        assert_eq!(
            telemetry.resource().get(&opentelemetry::Key::new("service.name")),
            Some(opentelemetry::Value::from("demo-api-service"))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_init_rejects_invalid_endpoint() {
        let err = Telemetry::init(TelemetryConfig::new("demo", "http://[::1"))
            .expect_err("malformed endpoint must fail");

        assert!(matches!(
            err,
            TelemetryError::ExporterBuild { signal: "span", .. }
        ));
    }
}
