//! Prometheus metrics for the HTTP surface.
//!
//! The recorder is installed once per process. [`MetricsLayer`] records one
//! observation set per request; `/metrics` itself is skipped.

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::{
    future::Future,
    pin::Pin,
    sync::{Mutex, OnceLock},
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};

use super::matched_route;
use crate::AppState;

// ============================================================================
// Recorder
// ============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

pub const METRICS_PATH: &str = "/metrics";

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
const SIZE_BUCKETS: &[f64] = &[
    100.0,
    1_000.0,
    10_000.0,
    100_000.0,
    1_000_000.0,
    10_000_000.0,
    100_000_000.0,
];

/// Installs the Prometheus recorder and returns its render handle.
///
/// Safe to call more than once; later calls return the existing handle.
pub fn init_metrics() -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let _guard = INIT_LOCK
        .lock()
        .map_err(|_| MetricsError::Installation("init lock poisoned".to_string()))?;
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Installation(e.to_string()))?
        .set_buckets_for_metric(
            Matcher::Full("http_request_size_bytes".to_string()),
            SIZE_BUCKETS,
        )
        .map_err(|e| MetricsError::Installation(e.to_string()))?
        .set_buckets_for_metric(
            Matcher::Full("http_response_size_bytes".to_string()),
            SIZE_BUCKETS,
        )
        .map_err(|e| MetricsError::Installation(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    register_metric_descriptions();

    let handle = PROMETHEUS_HANDLE.get_or_init(|| handle);
    Ok(handle.clone())
}

fn register_metric_descriptions() {
    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_request_errors_total",
        Unit::Count,
        "Total number of HTTP requests answered with status >= 400"
    );
    describe_histogram!(
        "http_request_size_bytes",
        Unit::Bytes,
        "HTTP request body size in bytes"
    );
    describe_histogram!(
        "http_response_size_bytes",
        Unit::Bytes,
        "HTTP response body size in bytes"
    );
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to install metrics exporter: {0}")]
    Installation(String),
}

// ============================================================================
// Scrape endpoint
// ============================================================================

/// Prometheus text exposition of every recorded series.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

// ============================================================================
// Request observations
// ============================================================================

/// Labels and sizes collected for one finished request.
#[derive(Debug, Clone)]
pub struct RequestObservation {
    pub method: String,
    pub path: String,
    pub status: StatusCode,
    pub elapsed_secs: f64,
    pub request_size: Option<u64>,
    pub response_size: Option<u64>,
}

impl RequestObservation {
    pub fn record(self) {
        let status_code = self.status.as_u16().to_string();

        counter!(
            "http_requests_total",
            "method" => self.method.clone(),
            "path" => self.path.clone(),
            "status_code" => status_code.clone()
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "method" => self.method.clone(),
            "path" => self.path.clone(),
            "status_code" => status_code.clone()
        )
        .record(self.elapsed_secs);

        if self.status.as_u16() >= 400 {
            counter!(
                "http_request_errors_total",
                "method" => self.method.clone(),
                "path" => self.path.clone(),
                "status_code" => status_code.clone()
            )
            .increment(1);
        }

        if let Some(size) = self.request_size.filter(|s| *s > 0) {
            histogram!(
                "http_request_size_bytes",
                "method" => self.method.clone(),
                "path" => self.path.clone()
            )
            .record(size as f64);
        }

        if let Some(size) = self.response_size.filter(|s| *s > 0) {
            histogram!(
                "http_response_size_bytes",
                "method" => self.method,
                "path" => self.path,
                "status_code" => status_code
            )
            .record(size as f64);
        }
    }
}

fn content_length(headers: &axum::http::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Body length when the body reports an exact size, else `Content-Length`.
pub fn known_response_size(response: &Response) -> Option<u64> {
    response
        .body()
        .size_hint()
        .exact()
        .or_else(|| content_length(response.headers()))
}

// ============================================================================
// Middleware
// ============================================================================

/// Tower layer recording HTTP metrics for every request except the scrape.
#[derive(Debug, Clone, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for MetricsMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let start = Instant::now();
        let excluded = req.uri().path() == METRICS_PATH;
        let method = req.method().to_string();
        let path = matched_route(&req);
        let request_size = content_length(req.headers());

        let future = self.inner.call(req);

        Box::pin(async move {
            let response = future.await?;

            if !excluded {
                RequestObservation {
                    method,
                    path,
                    status: response.status(),
                    elapsed_secs: start.elapsed().as_secs_f64(),
                    request_size,
                    response_size: known_response_size(&response),
                }
                .record();
            }

            Ok(response)
        })
    }
}
