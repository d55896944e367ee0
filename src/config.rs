//! Configuration parsing for the Faultline demo service.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;
use std::time::Duration;

use crate::observability::provider::TelemetryConfig;
use crate::observability::resource::DEFAULT_SERVICE_VERSION;

/// Faultline: demo HTTP service that exports only failed request spans.
#[derive(Parser, Debug, Clone)]
#[command(name = "faultline")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "FAULTLINE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Service name reported to the collector
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "demo-api-service")]
    pub service_name: String,

    /// Deployment environment reported to the collector (optional)
    #[arg(long, env = "FAULTLINE_ENVIRONMENT")]
    pub environment: Option<String>,

    /// OpenTelemetry collector endpoint (OTLP/gRPC, insecure)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value = "localhost:4317")]
    pub otel_endpoint: String,

    /// Paths answered by the demo handler
    #[arg(
        long,
        env = "FAULTLINE_PATHS",
        value_delimiter = ',',
        default_value = "/,/user,/product"
    )]
    pub paths: Vec<String>,

    /// Percentage of requests that fail with a simulated error
    #[arg(
        long,
        env = "FAULTLINE_ERROR_RATE",
        default_value_t = 30,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub error_rate: u8,

    /// Seconds to wait for in-flight requests after a shutdown signal
    #[arg(long, env = "FAULTLINE_GRACE_PERIOD_SECS", default_value_t = 30)]
    pub grace_period_secs: u64,

    /// Seconds allowed for flushing telemetry at exit, after the server has drained
    #[arg(long, env = "FAULTLINE_TELEMETRY_SHUTDOWN_SECS", default_value_t = 10)]
    pub telemetry_shutdown_secs: u64,

    /// Seconds allowed for a single export call
    #[arg(long, env = "FAULTLINE_EXPORT_TIMEOUT_SECS", default_value_t = 30)]
    pub export_timeout_secs: u64,

    /// Milliseconds between span batch exports
    #[arg(long, env = "FAULTLINE_EXPORT_INTERVAL_MS", default_value_t = 5000)]
    pub export_interval_ms: u64,

    /// Maximum spans per export batch
    #[arg(long, env = "FAULTLINE_EXPORT_BATCH_SIZE", default_value_t = 512)]
    pub export_batch_size: usize,

    /// Milliseconds between metric collections
    #[arg(long, env = "FAULTLINE_METRIC_INTERVAL_MS", default_value_t = 1000)]
    pub metric_interval_ms: u64,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Telemetry settings derived from this configuration.
    pub fn telemetry(&self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();
        TelemetryConfig {
            service_name: self.service_name.clone(),
            service_version: DEFAULT_SERVICE_VERSION.into(),
            environment: self.environment.clone(),
            collector_endpoint: self.otel_endpoint.clone(),
            export_timeout: Duration::from_secs(self.export_timeout_secs),
            max_queue_size: defaults.max_queue_size.max(self.export_batch_size),
            max_export_batch_size: self.export_batch_size,
            scheduled_delay: Duration::from_millis(self.export_interval_ms),
            metric_interval: Duration::from_millis(self.metric_interval_ms),
            shutdown_timeout: Duration::from_secs(self.telemetry_shutdown_secs),
        }
    }

    /// Create a configuration for testing.
    pub fn test_config(error_rate: u8) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0, // Random port
            error_rate,
            log_level: "debug".into(),
            grace_period_secs: 1,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            log_level: "info".into(),
            service_name: "demo-api-service".into(),
            environment: None,
            otel_endpoint: "localhost:4317".into(),
            paths: vec!["/".into(), "/user".into(), "/product".into()],
            error_rate: 30,
            grace_period_secs: 30,
            telemetry_shutdown_secs: 10,
            export_timeout_secs: 30,
            export_interval_ms: 5000,
            export_batch_size: 512,
            metric_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.paths, vec!["/", "/user", "/product"]);
    }

    #[test]
    fn test_parse_cli_arguments() {
        let config = Config::try_parse_from([
            "faultline",
            "--port",
            "9090",
            "--paths",
            "/a,/b",
            "--error-rate",
            "100",
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.paths, vec!["/a", "/b"]);
        assert_eq!(config.error_rate, 100);
    }

    #[test]
    fn test_error_rate_is_a_percentage() {
        assert!(Config::try_parse_from(["faultline", "--error-rate", "101"]).is_err());
    }

    #[test]
    fn test_telemetry_config_follows_cli() {
        let config = Config {
            otel_endpoint: "collector:4317".into(),
            export_batch_size: 4096,
            grace_period_secs: 60,
            telemetry_shutdown_secs: 10,
            ..Config::default()
        };
        let telemetry = config.telemetry();

        assert_eq!(telemetry.collector_endpoint, "collector:4317");
        assert_eq!(telemetry.service_version, "1.0.0");
        assert_eq!(telemetry.max_export_batch_size, 4096);
        assert_eq!(telemetry.max_queue_size, 4096);
        assert_eq!(telemetry.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_flush_deadline_is_independent_of_grace_period() {
        let config = Config::try_parse_from([
            "faultline",
            "--grace-period-secs",
            "45",
            "--telemetry-shutdown-secs",
            "5",
        ])
        .unwrap();

        assert_eq!(config.grace_period(), Duration::from_secs(45));
        assert_eq!(config.telemetry().shutdown_timeout, Duration::from_secs(5));
    }
}
