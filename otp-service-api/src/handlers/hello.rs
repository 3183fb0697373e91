use std::time::Duration;

use axum::Json;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{info, info_span, Instrument};

use crate::error::{ApiError, ApiResult};

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello, World!" }))
}

/// Sleeps 1 to 3 seconds and reports how long.
pub async fn delayed_hello() -> Json<Value> {
    let delay_ms: u64 = rand::thread_rng().gen_range(1000..3000);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    Json(json!({
        "message": format!("Hello after delay: {:.2} seconds", delay_ms as f64 / 1000.0)
    }))
}

pub async fn child_hello() -> Json<Value> {
    async {
        info!("Running child operation");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    .instrument(info_span!("child_operation"))
    .await;

    Json(json!({ "message": "Hello from child span!" }))
}

/// Always fails with a 400 so the error pipeline can be exercised.
pub async fn test_error() -> ApiResult<Json<Value>> {
    Err(ApiError::BadRequest("This is a test error".to_string()))
}
