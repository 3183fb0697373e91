use std::any::Any;

use axum::response::Response;

use crate::error::ErrorReport;

/// Response for a panicking handler. The panic message is only logged.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Recovered from handler panic");

    ErrorReport::internal(format!("panic: {detail}")).into_http_response(None)
}
