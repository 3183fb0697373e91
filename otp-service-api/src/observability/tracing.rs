//! OpenTelemetry tracer provider and the per-request server span.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use opentelemetry::{
    global,
    propagation::Extractor,
    trace::{SpanContext, TraceContextExt},
    Context as OtelContext, KeyValue,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{Config, TracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use otp_service_core::{AppMode, TracingSettings};
use tracing::{field::Empty, info_span, Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{matched_route, metrics, sampler::ServiceSampler, TelemetryError};

const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// Builds a provider with one batch exporter per enabled backend.
pub fn build_tracer_provider(
    settings: &TracingSettings,
    mode: AppMode,
) -> Result<TracerProvider, TelemetryError> {
    let resource = Resource::new(vec![
        KeyValue::new(SERVICE_NAME, settings.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, settings.service_version.clone()),
        KeyValue::new(DEPLOYMENT_ENVIRONMENT, mode.as_str()),
    ]);

    let mut builder = TracerProvider::builder().with_config(
        Config::default()
            .with_sampler(ServiceSampler::from_config(&settings.route_policy))
            .with_resource(resource),
    );

    for (name, endpoint) in settings.active_exporters() {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| TelemetryError::Exporter {
                exporter: name,
                reason: e.to_string(),
            })?;
        builder = builder.with_batch_exporter(exporter, runtime::Tokio);
    }

    Ok(builder.build())
}

struct HeaderMapExtractor<'a> {
    headers: &'a HeaderMap,
}

impl<'a> Extractor for HeaderMapExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|k| k.as_str()).collect()
    }
}

/// Remote parent from `traceparent`/`tracestate`, if one is present and valid.
pub fn extract_parent_context(headers: &HeaderMap) -> Option<OtelContext> {
    let context =
        global::get_text_map_propagator(|propagator| propagator.extract(&HeaderMapExtractor { headers }));

    if context.span().span_context().is_valid() {
        Some(context)
    } else {
        None
    }
}

fn current_span_context() -> Option<SpanContext> {
    let context = Span::current().context();
    let span_context = context.span().span_context().clone();
    span_context.is_valid().then_some(span_context)
}

/// Hex trace id of the active request span.
pub fn current_trace_id() -> Option<String> {
    current_span_context().map(|sc| sc.trace_id().to_string())
}

/// Hex span id of the active request span.
pub fn current_span_id() -> Option<String> {
    current_span_context().map(|sc| sc.span_id().to_string())
}

/// Opens the `"<METHOD> <route>"` server span and runs the request inside it.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = matched_route(&request);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let span = info_span!(
        "http_request",
        otel.name = %format!("{} {}", method, route),
        otel.kind = "server",
        otel.status_code = Empty,
        http.method = %method,
        http.route = %route,
        http.target = %request.uri(),
        http.user_agent = %user_agent,
        http.status_code = Empty,
        http.response.size = Empty,
        correlation_id = Empty,
    );

    if let Some(parent) = extract_parent_context(request.headers()) {
        span.set_parent(parent);
    }

    async move {
        let response = next.run(request).await;

        let span = Span::current();
        let status = response.status();
        span.record("http.status_code", status.as_u16());
        if let Some(size) = metrics::known_response_size(&response) {
            span.record("http.response.size", size);
        }
        if status.is_server_error() {
            span.record("otel.status_code", "ERROR");
        }

        response
    }
    .instrument(span)
    .await
}
