//! MongoDB latency benchmarks keyed by tenant and phone number.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use otp_service_core::{BenchmarkStore, OtpRecord};
use serde_json::{json, Value};

use super::{required_param, ttl_param};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

fn mongo_store(state: &AppState) -> ApiResult<Arc<dyn BenchmarkStore>> {
    state
        .mongo
        .clone()
        .ok_or_else(|| ApiError::Internal("mongo store is not configured".to_string()))
}

/// Stored values that are not a complete OTP document get wrapped in one.
pub fn normalize_stored_value(tenant: &str, phone: &str, raw: &str) -> ApiResult<String> {
    match serde_json::from_str::<OtpRecord>(raw) {
        Ok(record) if !record.tenant_id.is_empty() && !record.phone_number.is_empty() => {
            Ok(raw.to_string())
        }
        _ => {
            let wrapped = OtpRecord {
                tenant_id: tenant.to_string(),
                phone_number: phone.to_string(),
                otp_code: raw.to_string(),
            };
            serde_json::to_string(&wrapped)
                .map_err(|e| ApiError::Internal(format!("failed to marshal value: {e}")))
        }
    }
}

/// `POST /v1/mongo/set?tenant&phone[&value][&ttl]`
pub async fn set(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let tenant = required_param(&params, "tenant")?;
    let phone = required_param(&params, "phone")?;
    let store = mongo_store(&state)?;

    let value = match params.get("value").filter(|v| !v.is_empty()) {
        Some(value) => value.clone(),
        None => serde_json::to_string(&OtpRecord::benchmark(tenant, phone))
            .map_err(|e| ApiError::Internal(format!("failed to marshal value: {e}")))?,
    };

    store
        .set(&OtpRecord::key(tenant, phone), &value, ttl_param(&params))
        .await?;

    Ok(Json(json!({ "ok": true })))
}

/// `GET /v1/mongo/get?tenant&phone`
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let tenant = required_param(&params, "tenant")?;
    let phone = required_param(&params, "phone")?;
    let store = mongo_store(&state)?;
    let key = OtpRecord::key(tenant, phone);

    let entry = match store.get(&key).await? {
        Some(entry) if !entry.is_expired_at(Utc::now()) => entry,
        Some(_) => {
            store.delete(&key).await.ok();
            return Ok(Json(json!({ "found": false })));
        }
        None => return Ok(Json(json!({ "found": false }))),
    };

    let value = normalize_stored_value(tenant, phone, &entry.value)?;

    Ok(Json(json!({ "found": true, "value": value })))
}
