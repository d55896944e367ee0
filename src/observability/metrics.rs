//! Metric instrument registry.
//!
//! Key metrics of the demo service:
//! - api.request.total: Counter of requests received
//! - api.request.duration: Histogram of request duration in milliseconds
//! - api.error.total: Counter of simulated failures
//! - api.request.in_flight: Observable gauge of requests being handled

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use opentelemetry::metrics::{AsyncInstrument, Counter, Histogram, Meter, ObservableGauge};

use crate::error::TelemetryError;

/// Upper bounds (ms) of the request duration buckets.
pub const REQUEST_DURATION_BOUNDARIES_MS: [f64; 10] = [
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

const MAX_INSTRUMENT_NAME_LEN: usize = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Histogram,
    ObservableGauge,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Counter => "counter",
            Self::Histogram => "histogram",
            Self::ObservableGauge => "observable gauge",
        })
    }
}

#[derive(Clone, Debug)]
struct Registration {
    kind: InstrumentKind,
    unit: String,
}

/// Creates instruments on a meter and remembers their shape.
///
/// The SDK only warns about duplicate instrument names and then aggregates
/// them separately. Registering through this type turns a mismatch into an
/// error the caller has to handle.
#[derive(Debug)]
pub struct MetricRegistry {
    meter: Meter,
    /// Registered instruments keyed by lowercase name.
    instruments: Mutex<HashMap<String, Registration>>,
}

impl MetricRegistry {
    pub fn new(meter: Meter) -> Self {
        Self {
            meter,
            instruments: Mutex::new(HashMap::new()),
        }
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    /// Create a monotonic counter. Deltas are unsigned, so it can only grow.
    pub fn create_counter(
        &self,
        name: &str,
        description: &str,
        unit: &str,
    ) -> Result<Counter<u64>, TelemetryError> {
        self.register(name, InstrumentKind::Counter, unit)?;
        Ok(self
            .meter
            .u64_counter(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .build())
    }

    /// Create a histogram, optionally with explicit ascending bucket edges.
    ///
    /// Buckets are upper-inclusive: with edges `[5, 10]` a value of 5 lands
    /// in the first bucket and 11 in the overflow bucket.
    pub fn create_histogram(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        boundaries: Option<Vec<f64>>,
    ) -> Result<Histogram<f64>, TelemetryError> {
        if let Some(bounds) = &boundaries {
            validate_boundaries(name, bounds)?;
        }
        self.register(name, InstrumentKind::Histogram, unit)?;

        let mut builder = self
            .meter
            .f64_histogram(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string());
        if let Some(bounds) = boundaries {
            builder = builder.with_boundaries(bounds);
        }
        Ok(builder.build())
    }

    /// Create a gauge whose value is read by `callback` at every collection.
    ///
    /// The metrics runtime invokes the callback, never application code. It
    /// should only read current state and report it through the sink.
    pub fn create_observable_gauge<F>(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        callback: F,
    ) -> Result<ObservableGauge<f64>, TelemetryError>
    where
        F: Fn(&dyn AsyncInstrument<f64>) + Send + Sync + 'static,
    {
        self.register(name, InstrumentKind::ObservableGauge, unit)?;
        Ok(self
            .meter
            .f64_observable_gauge(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .with_callback(callback)
            .build())
    }

    /// Whether an instrument with this name (case-insensitive) exists.
    pub fn contains(&self, name: &str) -> bool {
        self.instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&name.to_ascii_lowercase())
    }

    fn register(&self, name: &str, kind: InstrumentKind, unit: &str) -> Result<(), TelemetryError> {
        validate_name(name)?;

        let mut instruments = self
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match instruments.get(&name.to_ascii_lowercase()) {
            Some(existing) if existing.kind == kind && existing.unit == unit => Ok(()),
            Some(existing) => Err(TelemetryError::InstrumentConflict {
                name: name.to_string(),
                existing: existing.kind,
                existing_unit: existing.unit.clone(),
                requested: kind,
                requested_unit: unit.to_string(),
            }),
            None => {
                instruments.insert(
                    name.to_ascii_lowercase(),
                    Registration {
                        kind,
                        unit: unit.to_string(),
                    },
                );
                tracing::debug!(instrument = name, %kind, unit, "Registered instrument");
                Ok(())
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), TelemetryError> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_INSTRUMENT_NAME_LEN
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'));

    if valid {
        Ok(())
    } else {
        Err(TelemetryError::InvalidInstrumentName(name.to_string()))
    }
}

fn validate_boundaries(name: &str, boundaries: &[f64]) -> Result<(), TelemetryError> {
    let finite = boundaries.iter().all(|b| b.is_finite());
    let ascending = boundaries.windows(2).all(|pair| pair[0] < pair[1]);

    if finite && ascending {
        Ok(())
    } else {
        Err(TelemetryError::InvalidBoundaries(name.to_string()))
    }
}

/// Instruments recorded by the demo request handler.
#[derive(Debug)]
pub struct AppMetrics {
    /// Total number of requests received.
    pub request_total: Counter<u64>,
    /// Request duration in milliseconds.
    pub request_duration: Histogram<f64>,
    /// Total number of failed requests.
    pub error_total: Counter<u64>,
    in_flight: Arc<AtomicI64>,
    _in_flight_gauge: ObservableGauge<f64>,
}

impl AppMetrics {
    pub fn new(registry: &MetricRegistry) -> Result<Self, TelemetryError> {
        let in_flight = Arc::new(AtomicI64::new(0));
        let observed = Arc::clone(&in_flight);

        Ok(Self {
            request_total: registry.create_counter(
                "api.request.total",
                "Total number of requests received",
                "{request}",
            )?,
            request_duration: registry.create_histogram(
                "api.request.duration",
                "Duration of requests in milliseconds",
                "ms",
                Some(REQUEST_DURATION_BOUNDARIES_MS.to_vec()),
            )?,
            error_total: registry.create_counter(
                "api.error.total",
                "Total number of errors encountered",
                "{error}",
            )?,
            _in_flight_gauge: registry.create_observable_gauge(
                "api.request.in_flight",
                "Requests currently being handled",
                "{request}",
                move |sink| sink.observe(observed.load(Ordering::Relaxed) as f64, &[]),
            )?,
            in_flight,
        })
    }

    /// Count a request as in flight until the guard is dropped.
    pub fn track_in_flight(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

/// Decrements the in-flight count on drop, including on early returns.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicI64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
