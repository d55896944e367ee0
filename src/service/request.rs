//! Demo request handler.
//!
//! Every request gets one span. A configurable share of requests fails on
//! purpose so that the error-only export path has something to ship.

use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use opentelemetry::KeyValue;
use thiserror::Error;

use super::AppState;
use crate::generate_request_id;

/// The failure injected into unlucky requests.
#[derive(Debug, Error)]
#[error("simulated internal server error")]
pub struct SimulatedError;

/// Handle any request on a configured path.
///
/// Answers 200 or, with probability `error_rate`, 500 after recording the
/// failure on the request span.
pub async fn handle_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, &'static str) {
    let start = Instant::now();
    let path = uri.path().to_string();
    let _in_flight = state.metrics.track_in_flight();

    state.metrics.request_total.add(
        1,
        &[
            KeyValue::new("path", path.clone()),
            KeyValue::new("method", method.to_string()),
        ],
    );

    let parent = state.telemetry.extract_context(&headers);
    let (_cx, span) = state.telemetry.start_span(&parent, "handle_request");
    let url = uri.to_string();
    span.set_attributes([("http.method", method.as_str()), ("http.url", url.as_str())]);
    span.set_attribute("request.id", generate_request_id());

    let status = if state.should_fail() {
        span.record_error(&SimulatedError, "Request processing failed");
        state.metrics.error_total.add(
            1,
            &[
                KeyValue::new("error_type", "internal_server_error"),
                KeyValue::new("path", path.clone()),
            ],
        );

        let ids = span.identifiers();
        tracing::warn!(
            trace_id = %ids.trace_id,
            span_id = %ids.span_id,
            path = %path,
            "Request failed"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        span.add_event("request_processed", [("status", "success")]);
        StatusCode::OK
    };

    span.set_attribute("http.status_code", i64::from(status.as_u16()));
    span.end();

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    state.metrics.request_duration.record(
        duration_ms,
        &[
            KeyValue::new("path", path),
            KeyValue::new("status", i64::from(status.as_u16())),
        ],
    );

    tracing::debug!(status = status.as_u16(), duration_ms, "Request handled");

    let body = if status.is_success() {
        "Request processed successfully"
    } else {
        "Internal Server Error"
    };
    (status, body)
}
