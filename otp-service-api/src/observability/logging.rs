//! Structured JSON logging and the request/response access log.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{info, Subscriber};
use tracing_subscriber::{fmt, registry::LookupSpan, EnvFilter, Layer};

use super::metrics::known_response_size;
use crate::middleware::{CorrelationId, TraceContext};

/// Maps configured level names onto `tracing` directives.
///
/// Unknown names fall back to `info`.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "fatal" | "panic" => "error",
        "off" | "none" | "disabled" => "off",
        _ => "info",
    }
}

/// `RUST_LOG` wins when set; otherwise the configured level applies.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(normalize_level(level)))
}

/// One JSON object per event with the event fields at top level.
pub fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(true)
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer.
pub fn client_ip(request: &Request) -> String {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

/// Emits one `"HTTP request/response"` line per request.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();
    let trace = request
        .extensions()
        .get::<TraceContext>()
        .cloned()
        .unwrap_or_default();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let ip = client_ip(&request);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = next.run(request).await;

    info!(
        correlation_id = %correlation_id,
        trace_id = trace.trace_id.as_deref().unwrap_or_default(),
        span_id = trace.span_id.as_deref().unwrap_or_default(),
        method = %method,
        path = %path,
        query = %query,
        ip = %ip,
        user_agent = %user_agent,
        status_code = response.status().as_u16(),
        response_size = known_response_size(&response).unwrap_or(0),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "HTTP request/response"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use rstest::rstest;

    #[rstest]
    #[case("debug", "debug")]
    #[case("INFO", "info")]
    #[case("warning", "warn")]
    #[case(" warn ", "warn")]
    #[case("fatal", "error")]
    #[case("disabled", "off")]
    #[case("none", "off")]
    #[case("verbose", "info")]
    #[case("", "info")]
    fn normalizes_levels(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_level(input), expected);
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_peer_address() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));
        assert_eq!(client_ip(&request), "127.0.0.1");

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare), "");
    }
}
