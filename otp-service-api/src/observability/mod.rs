//! Observability: JSON logging, Prometheus metrics and OpenTelemetry tracing.
//!
//! [`init_telemetry`] installs the global subscriber once at startup and
//! returns a guard that flushes the tracer provider on shutdown.

pub mod logging;
pub mod metrics;
pub mod sampler;
pub mod tracing;

use axum::extract::{MatchedPath, Request};
use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::TracerProvider};
use otp_service_core::AppConfig;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use self::logging::{env_filter, normalize_level, request_logging_middleware};
pub use self::metrics::{init_metrics, metrics_handler, MetricsError, MetricsLayer};
pub use self::sampler::{extract_route, RouteDecision, RoutePolicy, RouteSampler, ServiceSampler};
pub use self::tracing::{current_span_id, current_trace_id, tracing_middleware};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to build {exporter} span exporter: {reason}")]
    Exporter {
        exporter: &'static str,
        reason: String,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Keeps the tracer provider alive until shutdown.
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl TelemetryGuard {
    pub fn tracing_active(&self) -> bool {
        self.provider.is_some()
    }

    /// Flushes pending spans and stops the exporters.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                ::tracing::error!(error = %e, "Failed to shut down tracer provider");
            } else {
                ::tracing::info!("Tracer provider shut down");
            }
        }
    }
}

/// Installs the W3C propagator, the tracer provider and the JSON subscriber.
pub fn init_telemetry(config: &AppConfig) -> Result<TelemetryGuard, TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporters = config.tracing.active_exporters();
    let provider = if config.tracing.enabled && !exporters.is_empty() {
        Some(self::tracing::build_tracer_provider(
            &config.tracing,
            config.app.mode,
        )?)
    } else {
        None
    };

    let otel_layer = provider.as_ref().map(|provider| {
        global::set_tracer_provider(provider.clone());
        let tracer = provider.tracer(config.tracing.service_name.clone());
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter(&config.app.log_level))
        .with(otel_layer)
        .with(logging::json_layer())
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    if config.tracing.enabled && exporters.is_empty() {
        ::tracing::warn!("Tracing enabled but no exporter is configured; spans are not recorded");
    } else if provider.is_some() {
        ::tracing::info!(
            service_name = %config.tracing.service_name,
            exporters = ?exporters,
            route_policy = config.tracing.route_policy.enabled,
            "OpenTelemetry tracing initialized"
        );
    }

    Ok(TelemetryGuard { provider })
}

/// Route label for a request: the matched template with `{param}`
/// placeholders, or the raw path when nothing matched.
pub fn matched_route(request: &Request) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => route_template(matched.as_str()),
        None => request.uri().path().to_string(),
    }
}

/// Rewrites `:param` and `*rest` segments to `{param}` and `{*rest}`.
pub fn route_template(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
