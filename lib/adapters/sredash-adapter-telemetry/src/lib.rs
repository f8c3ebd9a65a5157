//! Logging and trace export setup.
//!
//! [`install`] wires a `tracing` subscriber (env filter plus fmt output) and,
//! when the OTLP exporter can be built, bridges spans into a batch exporter.

pub mod config;
pub mod propagation;
pub mod transport;

use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{self as sdktrace, BatchSpanProcessor, TracerProvider};
use opentelemetry_sdk::{Resource, runtime};
use thiserror::Error;
use tracing::{debug, dispatcher, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

pub use config::{BatchSettings, TelemetryConfig};
pub use propagation::{PropagationAllowList, RequestInjector};
pub use transport::TracedTransport;

static INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry is already installed")]
    AlreadyInstalled,
    #[error("a global tracing subscriber is already set")]
    SubscriberAlreadySet,
    #[error("failed to set the global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::dispatcher::SetGlobalDefaultError),
}

/// Keeps the exporting provider reachable for explicit flushes.
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("exporting", &self.is_exporting())
            .finish()
    }
}

impl TelemetryGuard {
    /// False when the exporter could not be built and only logging runs.
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Push buffered spans out now. Export failures are logged, not returned.
    pub fn force_flush(&self) {
        let Some(provider) = &self.provider else {
            return;
        };
        for result in provider.force_flush() {
            if let Err(err) = result {
                debug!(error = %err, "span flush failed");
            }
        }
    }
}

/// Install logging and tracing for the process. Callable once.
///
/// Must run inside a tokio runtime; the batch processor's timer is created
/// here. If the exporter cannot be built, logging is still installed and
/// spans stay local.
pub fn install(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    if INSTALLED.get().is_some() {
        return Err(TelemetryError::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(TelemetryError::SubscriberAlreadySet);
    }
    INSTALLED
        .set(())
        .map_err(|_| TelemetryError::AlreadyInstalled)?;

    let (provider, export_error) = match build_provider(config) {
        Ok(provider) => (Some(provider), None),
        Err(err) => (None, Some(err)),
    };

    let otel_layer = provider.as_ref().map(|provider| {
        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TraceContextPropagator::new());
        let tracer = provider.versioned_tracer(
            config.service_name.clone(),
            Some(config.service_version.clone()),
            None::<&'static str>,
            None,
        );
        tracing_opentelemetry::layer().with_tracer(tracer)
    });
    let _ = global::set_error_handler(|err| debug!(error = %err, "opentelemetry error"));

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(err) = export_error {
        warn!(
            collector = %config.collector_url,
            error = %err,
            "[Telemetry] exporter unavailable, spans will not be exported"
        );
    } else {
        info!(
            service = %config.service_name,
            version = %config.service_version,
            environment = %config.environment,
            collector = %config.collector_url,
            "[Telemetry] OpenTelemetry initialized"
        );
    }
    Ok(TelemetryGuard { provider })
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_provider(config: &TelemetryConfig) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(config.exporter_endpoint())
        .with_headers(config.headers.clone())
        .with_timeout(config.export_timeout)
        .build_span_exporter()?;

    let processor = BatchSpanProcessor::builder(exporter, runtime::TokioCurrentThread)
        .with_batch_config(config.batch.to_batch_config())
        .build();

    Ok(TracerProvider::builder()
        .with_span_processor(processor)
        .with_config(sdktrace::config().with_resource(Resource::new(config.resource_attributes())))
        .build())
}
