use axum::{extract::Request, middleware::Next, response::Response};

use crate::observability::{current_span_id, current_trace_id};

/// Trace and span ids of the request span, as seen by handlers and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

impl TraceContext {
    pub fn current() -> Self {
        Self {
            trace_id: current_trace_id(),
            span_id: current_span_id(),
        }
    }
}

pub async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(TraceContext::current());
    next.run(request).await
}
