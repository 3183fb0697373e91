use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, response::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::CorrelationId;
use crate::error::ErrorReport;

/// Largest framework error body folded into the JSON message.
const MAX_PLAIN_ERROR_BODY: usize = 16 * 1024;

/// Writes the single JSON error body for every failed request.
///
/// Handler errors arrive as an [`ErrorReport`] extension. Error statuses
/// produced by the framework itself (extractor rejections, 405) are
/// converted to the same shape.
pub async fn error_handling_middleware(request: Request, next: Next) -> Response {
    let correlation_id = request.extensions().get::<CorrelationId>().cloned();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let (mut parts, body) = next.run(request).await.into_parts();

    let report = match parts.extensions.remove::<ErrorReport>() {
        Some(report) => report,
        None if needs_rewrite(&parts) => plain_error_report(parts.status, body).await,
        None => return Response::from_parts(parts, body),
    };

    let request_id = correlation_id.as_ref().map(CorrelationId::as_str);
    let status_code = report.status.as_u16();

    if report.status.is_server_error() {
        error!(
            correlation_id = request_id.unwrap_or_default(),
            method = %method,
            path = %path,
            status_code,
            error = report.internal.as_deref().unwrap_or(report.message.as_str()),
            "Request error occurred"
        );
    } else {
        warn!(
            correlation_id = request_id.unwrap_or_default(),
            method = %method,
            path = %path,
            status_code,
            error = %report.message,
            "Request error occurred"
        );
    }

    let rebuilt = (report.status, Json(report.body(request_id))).into_response();
    carry_over(parts, rebuilt)
}

fn needs_rewrite(parts: &Parts) -> bool {
    let status = parts.status;
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    !is_json
}

async fn plain_error_report(status: StatusCode, body: Body) -> ErrorReport {
    let text = to_bytes(body, MAX_PLAIN_ERROR_BODY)
        .await
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .filter(|text| !text.is_empty());

    if status.is_server_error() {
        let mut report = ErrorReport::internal(text.unwrap_or_else(|| status.to_string()));
        report.status = status;
        return report;
    }

    ErrorReport {
        status,
        message: text.unwrap_or_else(|| reason(status).to_string()),
        details: None,
        internal: None,
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Error")
}

/// Keeps headers and extensions set by inner layers on the rewritten response.
fn carry_over(parts: Parts, rebuilt: Response) -> Response {
    let (mut new_parts, body): (Parts, Body) = rebuilt.into_parts();

    for (name, value) in parts.headers.iter() {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        new_parts.headers.append(name.clone(), value.clone());
    }
    new_parts.extensions = parts.extensions;

    Response::from_parts(new_parts, body)
}
