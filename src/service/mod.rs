//! HTTP handlers for the Faultline demo service.

pub mod request;

pub use request::{handle_request, SimulatedError};

use std::sync::Arc;

use rand::Rng;

use crate::observability::metrics::AppMetrics;
use crate::observability::provider::Telemetry;

/// State shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub telemetry: Arc<Telemetry>,
    pub metrics: Arc<AppMetrics>,
    /// Percentage of requests that fail on purpose.
    pub error_rate: u8,
}

impl AppState {
    pub fn new(telemetry: Arc<Telemetry>, metrics: Arc<AppMetrics>, error_rate: u8) -> Self {
        Self {
            telemetry,
            metrics,
            error_rate: error_rate.min(100),
        }
    }

    /// Roll the dice for a simulated failure.
    pub fn should_fail(&self) -> bool {
        match self.error_rate {
            0 => false,
            100 => true,
            rate => rand::rng().random_range(0..100u8) < rate,
        }
    }
}
