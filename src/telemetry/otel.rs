use std::{env, error::Error, sync::OnceLock};

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{self as sdktrace, Sampler},
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::Registry;

const DEFAULT_SERVICE_NAME: &str = "archive-comments-api";
const DEFAULT_TRACER_NAME: &str = "archive-comments";

static TRACER_PROVIDER: OnceLock<sdktrace::SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Clone, PartialEq)]
struct OtelConfig {
    endpoint: String,
    service_name: String,
    sample_ratio: f64,
}

impl OtelConfig {
    fn from_env() -> Option<Self> {
        Self::parse(
            env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            env::var("OTEL_SERVICE_NAME").ok(),
            env::var("OTEL_TRACES_SAMPLER_RATIO").ok(),
        )
    }

    fn parse(
        endpoint: Option<String>,
        service_name: Option<String>,
        sample_ratio: Option<String>,
    ) -> Option<Self> {
        let endpoint = endpoint.filter(|value| !value.trim().is_empty())?;
        let service_name = service_name
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let sample_ratio = sample_ratio
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| (0.0..=1.0).contains(value))
            .unwrap_or(1.0);

        Some(Self {
            endpoint,
            service_name,
            sample_ratio,
        })
    }
}

pub fn build_otel_layer()
-> Result<Option<OpenTelemetryLayer<Registry, sdktrace::Tracer>>, Box<dyn Error + Send + Sync>> {
    let Some(config) = OtelConfig::from_env() else {
        return Ok(None);
    };

    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(config.service_name)
        .with_attribute(KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION").to_string(),
        ))
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint)
        .build()?;

    let tracer_provider = sdktrace::SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.sample_ratio,
        ))))
        .with_batch_exporter(exporter)
        .build();

    let tracer = tracer_provider.tracer(DEFAULT_TRACER_NAME);
    let _ = TRACER_PROVIDER.set(tracer_provider.clone());
    global::set_tracer_provider(tracer_provider);

    Ok(Some(OpenTelemetryLayer::new(tracer)))
}

pub fn shutdown_tracer_provider() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            tracing::warn!("OpenTelemetry tracer shutdown failed: {}", err);
        }
    }
}
