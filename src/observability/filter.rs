//! Span exporter decorator that decides which finished spans leave the process.
//!
//! Exporting every successful span of a busy service is rarely worth the
//! cost. [`FilteringExporter`] sits between the batch processor and the
//! network exporter and forwards only the spans its [`SpanPredicate`]
//! retains. Span content is never touched, only batch membership.

use std::fmt;
use std::time::Duration;

use opentelemetry::trace::Status;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use opentelemetry_sdk::Resource;

/// Decides whether a finished span is exported.
pub trait SpanPredicate: Send + Sync + 'static {
    fn retain(&self, span: &SpanData) -> bool;
}

impl<F> SpanPredicate for F
where
    F: Fn(&SpanData) -> bool + Send + Sync + 'static,
{
    fn retain(&self, span: &SpanData) -> bool {
        self(span)
    }
}

/// Retains spans whose status is `Error`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorsOnly;

impl SpanPredicate for ErrorsOnly {
    fn retain(&self, span: &SpanData) -> bool {
        matches!(span.status, Status::Error { .. })
    }
}

/// Forwards only retained spans to the wrapped exporter.
pub struct FilteringExporter<E, P = ErrorsOnly> {
    inner: E,
    predicate: P,
}

impl<E> FilteringExporter<E, ErrorsOnly> {
    /// Wrap `inner` so that only spans in an error state reach it.
    pub fn errors_only(inner: E) -> Self {
        Self::new(inner, ErrorsOnly)
    }
}

impl<E, P> FilteringExporter<E, P> {
    pub fn new(inner: E, predicate: P) -> Self {
        Self { inner, predicate }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E, P> fmt::Debug for FilteringExporter<E, P>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteringExporter")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<E, P> SpanExporter for FilteringExporter<E, P>
where
    E: SpanExporter,
    P: SpanPredicate,
{
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        let received = batch.len();
        let retained: Vec<SpanData> = batch
            .into_iter()
            .filter(|span| self.predicate.retain(span))
            .collect();

        tracing::debug!(received, retained = retained.len(), "Filtered span batch");

        // Nothing qualifies, so skip the network round trip entirely.
        if retained.is_empty() {
            return Ok(());
        }

        self.inner.export(retained).await
    }

    fn shutdown_with_timeout(&mut self, timeout: Duration) -> OTelSdkResult {
        self.inner.shutdown_with_timeout(timeout)
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use opentelemetry::trace::{Span as _, Tracer as _, TracerProvider as _};
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records every batch it is handed.
    #[derive(Clone, Debug, Default)]
    struct RecordingExporter {
        batches: Arc<Mutex<Vec<Vec<SpanData>>>>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl RecordingExporter {
        fn batches(&self) -> Vec<Vec<SpanData>> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl SpanExporter for RecordingExporter {
        async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }

        fn shutdown_with_timeout(&mut self, _timeout: Duration) -> OTelSdkResult {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Produce finished spans with the given names and statuses.
    fn finished_spans(spans: &[(&'static str, Status)]) -> Vec<SpanData> {
        let capture = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(capture.clone())
            .build();
        let tracer = provider.tracer("filter-test");

        for (name, status) in spans {
            let mut span = tracer.start(*name);
            span.set_status(status.clone());
            span.end();
        }

        capture.get_finished_spans().unwrap()
    }

    fn names(batch: &[SpanData]) -> Vec<String> {
        batch.iter().map(|span| span.name.to_string()).collect()
    }

    #[test]
    fn test_errors_only_predicate() {
        let spans = finished_spans(&[
            ("unset", Status::Unset),
            ("ok", Status::Ok),
            ("failed", Status::error("boom")),
        ]);

        let retained: Vec<bool> = spans.iter().map(|s| ErrorsOnly.retain(s)).collect();
        assert_eq!(retained, vec![false, false, true]);
    }

    #[test]
    fn test_forwards_only_errors_in_order() {
        let spans = finished_spans(&[
            ("a", Status::error("first")),
            ("b", Status::Ok),
            ("c", Status::Unset),
            ("d", Status::error("second")),
            ("e", Status::error("third")),
        ]);
        let inner = RecordingExporter::default();
        let exporter = FilteringExporter::errors_only(inner.clone());

        block_on(exporter.export(spans)).unwrap();

        let batches = inner.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(names(&batches[0]), vec!["a", "d", "e"]);
    }

    #[test]
    fn test_all_success_batch_skips_inner_exporter() {
        let spans = finished_spans(&[("a", Status::Ok), ("b", Status::Unset)]);
        let inner = RecordingExporter::default();
        let exporter = FilteringExporter::errors_only(inner.clone());

        block_on(exporter.export(spans)).unwrap();
        block_on(exporter.export(Vec::new())).unwrap();

        assert!(inner.batches().is_empty());
    }

    #[test]
    fn test_retained_spans_are_unchanged() {
        let spans = finished_spans(&[("failed", Status::error("boom"))]);
        let original = spans[0].clone();
        let inner = RecordingExporter::default();
        let exporter = FilteringExporter::errors_only(inner.clone());

        block_on(exporter.export(spans)).unwrap();

        assert_eq!(inner.batches()[0][0], original);
    }

    #[test]
    fn test_custom_predicate() {
        let spans = finished_spans(&[
            ("keep-me", Status::Ok),
            ("drop-me", Status::error("boom")),
        ]);
        let inner = RecordingExporter::default();
        let exporter = FilteringExporter::new(inner.clone(), |span: &SpanData| {
            span.name.starts_with("keep")
        });

        block_on(exporter.export(spans)).unwrap();

        assert_eq!(names(&inner.batches()[0]), vec!["keep-me"]);
    }

    #[test]
    fn test_shutdown_delegates() {
        let inner = RecordingExporter::default();
        let mut exporter = FilteringExporter::errors_only(inner.clone());

        exporter.shutdown_with_timeout(Duration::from_secs(1)).unwrap();

        assert_eq!(inner.shutdowns.load(Ordering::SeqCst), 1);
    }
}
