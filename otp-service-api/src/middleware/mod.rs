//! Request interceptors and the order they run in.
//!
//! [`PIPELINE`] lists the interceptors outermost first. [`apply`] folds it
//! over a router, so the list is the single source of truth for ordering.
//!
//! Panics and timeouts are also caught just inside `ErrorHandling`, so
//! their responses still pass through every interceptor above it.

pub mod correlation;
pub mod error_handler;
pub mod recovery;
pub mod trace_context;

use std::time::Duration;

use axum::{http::StatusCode, middleware::from_fn, Router};
use tower_http::{
    catch_panic::CatchPanicLayer,
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
};

use crate::observability::{request_logging_middleware, tracing_middleware, MetricsLayer};

pub use correlation::{correlation_id_middleware, CorrelationId, CORRELATION_ID_HEADER};
pub use error_handler::error_handling_middleware;
pub use recovery::panic_response;
pub use trace_context::{trace_context_middleware, TraceContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interceptor {
    /// Last-resort panic guard for the interceptors themselves.
    Recovery,
    Metrics,
    /// Opens the server span and adopts a remote parent.
    Tracing,
    /// Needs the span from `Tracing` to record the id on it.
    CorrelationId,
    TraceContext,
    /// Reads the correlation id and trace ids set above it.
    Logging,
    /// Innermost so it sees every handler error first. Also owns the
    /// handler panic guard and the request timeouts.
    ErrorHandling,
}

/// Per-request deadlines enforced inside the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestTimeouts {
    /// Deadline for receiving the request body.
    pub read: Option<Duration>,
    /// Deadline for producing the whole response.
    pub write: Option<Duration>,
}

impl RequestTimeouts {
    pub fn new(read: Duration, write: Duration) -> Self {
        Self {
            read: Some(read),
            write: Some(write),
        }
    }
}

/// Outermost first.
pub const PIPELINE: [Interceptor; 7] = [
    Interceptor::Recovery,
    Interceptor::Metrics,
    Interceptor::Tracing,
    Interceptor::CorrelationId,
    Interceptor::TraceContext,
    Interceptor::Logging,
    Interceptor::ErrorHandling,
];

impl Interceptor {
    pub fn name(&self) -> &'static str {
        match self {
            Interceptor::Recovery => "recovery",
            Interceptor::Metrics => "metrics",
            Interceptor::Tracing => "tracing",
            Interceptor::CorrelationId => "correlation_id",
            Interceptor::TraceContext => "trace_context",
            Interceptor::Logging => "logging",
            Interceptor::ErrorHandling => "error_handling",
        }
    }

    fn wrap(self, router: Router, timeouts: RequestTimeouts) -> Router {
        match self {
            Interceptor::Recovery => router.layer(CatchPanicLayer::custom(panic_response)),
            Interceptor::Metrics => router.layer(MetricsLayer),
            Interceptor::Tracing => router.layer(from_fn(tracing_middleware)),
            Interceptor::CorrelationId => router.layer(from_fn(correlation_id_middleware)),
            Interceptor::TraceContext => router.layer(from_fn(trace_context_middleware)),
            Interceptor::Logging => router.layer(from_fn(request_logging_middleware)),
            Interceptor::ErrorHandling => {
                let mut router = router.layer(CatchPanicLayer::custom(panic_response));
                if let Some(write) = timeouts.write {
                    router = router.layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        write,
                    ));
                }
                if let Some(read) = timeouts.read {
                    router = router.layer(RequestBodyTimeoutLayer::new(read));
                }
                router.layer(from_fn(error_handling_middleware))
            }
        }
    }
}

/// Wraps `router` in every interceptor of [`PIPELINE`].
///
/// Layers added later run first, so the list is applied innermost first.
pub fn apply(router: Router, timeouts: RequestTimeouts) -> Router {
    PIPELINE
        .iter()
        .rev()
        .fold(router, |router, interceptor| interceptor.wrap(router, timeouts))
}
