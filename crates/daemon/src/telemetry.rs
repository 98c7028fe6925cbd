//! OpenTelemetry export for the tracing pipeline
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (e.g., http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name (default: transcache-daemon)
//!
//! # Example
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//! OTEL_SERVICE_NAME=transcache-staging \
//!     ./transcache-daemon
//! ```

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn endpoint() -> Option<String> {
    std::env::var(ENDPOINT_VAR).ok().filter(|e| !e.trim().is_empty())
}

/// Build the export layer when an endpoint is configured
///
/// Runs before the subscriber exists, so it must not log.
pub fn layer() -> Result<Option<BoxedLayer>> {
    let Some(endpoint) = endpoint() else {
        return Ok(None);
    };

    #[cfg(feature = "telemetry")]
    {
        Ok(Some(otlp_layer(&endpoint)?))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = endpoint;
        Ok(None)
    }
}

/// Report the export state once logging is up
pub fn log_status(enabled: bool) {
    match (endpoint(), enabled) {
        (None, _) => {
            tracing::debug!("OpenTelemetry not configured ({} not set)", ENDPOINT_VAR)
        }
        (Some(endpoint), true) => {
            tracing::info!(endpoint = %endpoint, "OpenTelemetry export enabled")
        }
        (Some(_), false) => {
            tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
            tracing::warn!("Rebuild with: cargo build --features telemetry");
        }
    }
}

/// Flush pending spans
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str) -> Result<BoxedLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "transcache-daemon".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name,
        )]))
        .build();

    let tracer = provider.tracer("transcache");
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
