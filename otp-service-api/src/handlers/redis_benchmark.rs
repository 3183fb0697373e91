//! Redis latency benchmarks: a fixed OTP document and a raw key-value pair.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use otp_service_core::{BenchmarkStore, OtpRecord};
use serde_json::{json, Value};

use super::{required_param, ttl_param, BENCHMARK_TTL};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

fn redis_store(state: &AppState) -> ApiResult<Arc<dyn BenchmarkStore>> {
    state
        .redis
        .clone()
        .ok_or_else(|| ApiError::Internal("redis store is not configured".to_string()))
}

/// `POST /v1/redis/otp/set?tenant_id&phone_number`
pub async fn otp_set(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let tenant_id = required_param(&params, "tenant_id")?;
    let phone_number = required_param(&params, "phone_number")?;
    let store = redis_store(&state)?;

    let record = OtpRecord::benchmark(tenant_id, phone_number);
    let value = serde_json::to_string(&record)
        .map_err(|e| ApiError::Internal(format!("failed to marshal OTP value: {e}")))?;

    store
        .set(&OtpRecord::key(tenant_id, phone_number), &value, BENCHMARK_TTL)
        .await?;

    Ok(Json(json!({ "ok": true })))
}

/// `GET /v1/redis/otp/get?tenant_id&phone_number`
pub async fn otp_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let tenant_id = required_param(&params, "tenant_id")?;
    let phone_number = required_param(&params, "phone_number")?;
    let store = redis_store(&state)?;

    let Some(entry) = store.get(&OtpRecord::key(tenant_id, phone_number)).await? else {
        return Ok(Json(json!({ "found": false })));
    };

    let record: OtpRecord = serde_json::from_str(&entry.value)
        .map_err(|e| ApiError::Internal(format!("failed to unmarshal OTP value: {e}")))?;

    Ok(Json(json!({
        "found": true,
        "tenant_id": record.tenant_id,
        "phone_number": record.phone_number,
        "otp_code": record.otp_code,
    })))
}

/// `POST /v1/redis/set?key&value[&ttl]`
pub async fn set(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let key = required_param(&params, "key")?;
    let value = required_param(&params, "value")?;
    let ttl = ttl_param(&params);

    redis_store(&state)?.set(key, value, ttl).await?;

    Ok(Json(json!({ "ok": true })))
}

/// `GET /v1/redis/get?key`
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let key = required_param(&params, "key")?;

    match redis_store(&state)?.get(key).await? {
        Some(entry) => Ok(Json(json!({ "found": true, "value": entry.value }))),
        None => Ok(Json(json!({ "found": false }))),
    }
}
