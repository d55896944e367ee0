//! Test utilities for Faultline tests.
//!
//! Provides:
//! - A telemetry pipeline backed by in-memory exporters
//! - Accessors for exported spans and metric points

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use faultline::observability::tracing::init_test_tracing;
use faultline::{Telemetry, TelemetryConfig};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics};
use opentelemetry_sdk::metrics::InMemoryMetricExporter;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData};

/// Telemetry wired to in-memory exporters instead of a collector.
///
/// Spans still pass through the error-only filter, so `exported_spans()` only
/// ever returns what would have been shipped.
pub struct TestTelemetry {
    pub telemetry: Arc<Telemetry>,
    pub spans: InMemorySpanExporter,
    pub metrics: InMemoryMetricExporter,
}

impl TestTelemetry {
    pub fn new(service_name: &str) -> Self {
        init_test_tracing();

        let config = TelemetryConfig {
            // Collection only happens on explicit flush
            metric_interval: Duration::from_secs(3600),
            scheduled_delay: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(5),
            ..TelemetryConfig::new(service_name, "localhost:4317")
        };

        let spans = InMemorySpanExporter::default();
        let metrics = InMemoryMetricExporter::default();
        let telemetry = Telemetry::builder(config).build_with(spans.clone(), metrics.clone());

        Self {
            telemetry: Arc::new(telemetry),
            spans,
            metrics,
        }
    }

    /// Flush both pipelines.
    pub fn flush(&self) {
        self.telemetry.force_flush().expect("flush failed");
    }

    /// Spans that reached the exporter.
    pub fn exported_spans(&self) -> Vec<SpanData> {
        self.flush();
        self.spans.get_finished_spans().expect("span exporter poisoned")
    }

    /// The most recent metrics snapshot.
    pub fn latest_metrics(&self) -> ResourceMetrics {
        self.flush();
        self.metrics
            .get_finished_metrics()
            .expect("metric exporter poisoned")
            .pop()
            .expect("no metrics exported")
    }
}

/// Find a metric by name in a snapshot.
pub fn find_metric<'a>(snapshot: &'a ResourceMetrics, name: &str) -> Option<&'a Metric> {
    snapshot
        .scope_metrics()
        .flat_map(|scope| scope.metrics())
        .find(|metric| metric.name() == name)
}

/// Sum of all data points of a u64 counter.
pub fn counter_total(snapshot: &ResourceMetrics, name: &str) -> u64 {
    let metric = find_metric(snapshot, name).unwrap_or_else(|| panic!("missing metric {name}"));
    match metric.data() {
        AggregatedMetrics::U64(MetricData::Sum(sum)) => {
            sum.data_points().map(|point| point.value()).sum()
        }
        other => panic!("{name} is not a u64 sum: {other:?}"),
    }
}

/// `(count, bucket_counts, bounds)` of each f64 histogram data point.
pub fn histogram_points(snapshot: &ResourceMetrics, name: &str) -> Vec<(u64, Vec<u64>, Vec<f64>)> {
    let metric = find_metric(snapshot, name).unwrap_or_else(|| panic!("missing metric {name}"));
    match metric.data() {
        AggregatedMetrics::F64(MetricData::Histogram(histogram)) => histogram
            .data_points()
            .map(|point| {
                (
                    point.count(),
                    point.bucket_counts().collect(),
                    point.bounds().collect(),
                )
            })
            .collect(),
        other => panic!("{name} is not an f64 histogram: {other:?}"),
    }
}

/// Values of each f64 gauge data point.
pub fn gauge_values(snapshot: &ResourceMetrics, name: &str) -> Vec<f64> {
    let metric = find_metric(snapshot, name).unwrap_or_else(|| panic!("missing metric {name}"));
    match metric.data() {
        AggregatedMetrics::F64(MetricData::Gauge(gauge)) => {
            gauge.data_points().map(|point| point.value()).collect()
        }
        other => panic!("{name} is not an f64 gauge: {other:?}"),
    }
}
