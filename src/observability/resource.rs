//! Resource descriptor attached to every exported span and metric point.

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

/// Version reported when the caller does not override it.
pub const DEFAULT_SERVICE_VERSION: &str = "1.0.0";

pub const SERVICE_VERSION: &str = "service.version";
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// Build the resource describing this process.
///
/// The SDK's default detectors still run, but `service.name` always wins
/// over whatever `OTEL_SERVICE_NAME` says.
pub fn build_resource(
    service_name: &str,
    service_version: &str,
    environment: Option<&str>,
) -> Resource {
    let mut builder = Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(KeyValue::new(SERVICE_VERSION, service_version.to_string()));

    if let Some(environment) = environment {
        builder = builder.with_attribute(KeyValue::new(
            DEPLOYMENT_ENVIRONMENT,
            environment.to_string(),
        ));
    }

    builder.build()
}
