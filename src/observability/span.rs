//! Span wrapper with typed attribute helpers.
//!
//! [`InstrumentedSpan`] keeps the span inside an OpenTelemetry [`Context`],
//! so the same context can be handed to child operations while the wrapper
//! enriches the span. Call [`InstrumentedSpan::end`] once the unit of work is
//! done. If a handle is dropped on an early return instead, the SDK ends the
//! span when the last context holding it goes away.

use std::borrow::Cow;
use std::error::Error;

use opentelemetry::trace::{SpanRef, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, Key, KeyValue, Value};

use super::attributes::{key_values, AttributeValue};

/// Trace and span identifiers in their canonical lowercase hex form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanIdentifiers {
    /// 32 hex characters.
    pub trace_id: String,
    /// 16 hex characters.
    pub span_id: String,
}

/// A started span plus helpers for enriching it.
#[derive(Clone, Debug)]
pub struct InstrumentedSpan {
    cx: Context,
}

impl InstrumentedSpan {
    /// Start `name` as a child of the span active in `parent`, or as a root
    /// span if `parent` carries none.
    ///
    /// Returns the context carrying the new span (hand it to child
    /// operations) together with the wrapper.
    pub fn start<T>(
        tracer: &T,
        parent: &Context,
        name: impl Into<Cow<'static, str>>,
    ) -> (Context, Self)
    where
        T: Tracer,
        T::Span: Send + Sync + 'static,
    {
        let span = tracer.start_with_context(name, parent);
        let cx = parent.with_span(span);
        (cx.clone(), Self { cx })
    }

    /// The context carrying this span.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    fn span(&self) -> SpanRef<'_> {
        self.cx.span()
    }

    /// Attach a timestamped event with typed attributes.
    pub fn add_event<I, K, V>(&self, name: impl Into<Cow<'static, str>>, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AttributeValue>,
    {
        self.span().add_event(name, key_values(attributes));
    }

    pub fn set_attribute(&self, key: impl Into<Key>, value: impl Into<AttributeValue>) {
        self.span()
            .set_attribute(KeyValue::new(key, Value::from(value.into())));
    }

    pub fn set_attributes<I, K, V>(&self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AttributeValue>,
    {
        self.span().set_attributes(key_values(attributes));
    }

    /// Mark the span as failed.
    ///
    /// Records `err` as an exception event and sets the status to `Error`
    /// with `message` as its description. The span stays open.
    pub fn record_error(&self, err: &dyn Error, message: impl Into<Cow<'static, str>>) {
        let span = self.span();
        span.record_error(err);
        span.set_status(Status::error(message));
    }

    pub fn identifiers(&self) -> SpanIdentifiers {
        let span = self.span();
        let span_context = span.span_context();
        SpanIdentifiers {
            trace_id: span_context.trace_id().to_string(),
            span_id: span_context.span_id().to_string(),
        }
    }

    /// End the span. It becomes read-only and is handed to the processor.
    pub fn end(self) {
        self.span().end();
    }
}
