use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use otp_service_core::TenantSettings;
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{CorrelationId, CORRELATION_ID_HEADER},
    AppState,
};

pub const INVALID_ID_MESSAGE: &str = "Invalid tenant settings id: must be a positive integer";

/// Positive integer ids only.
pub fn parse_tenant_settings_id(raw: &str) -> ApiResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(INVALID_ID_MESSAGE.to_string())),
    }
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<TenantSettings>> {
    let id = parse_tenant_settings_id(&raw_id)?;

    let settings = state
        .tenant_settings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant settings with id {id} not found")))?;

    Ok(Json(settings))
}

#[derive(Debug, Serialize)]
pub struct InsertedIdResponse {
    pub id: i64,
}

/// Inserts a benchmark row tagged with the request's correlation id.
pub async fn insert_benchmark(
    State(state): State<AppState>,
    correlation_id: Option<Extension<CorrelationId>>,
    headers: HeaderMap,
) -> ApiResult<Json<InsertedIdResponse>> {
    let tenant_code = correlation_id
        .map(|Extension(id)| id.as_str().to_string())
        .or_else(|| {
            headers
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::Internal("missing correlation_id".to_string()))?;

    let id = state.tenant_settings.insert_benchmark(&tenant_code).await?;

    Ok(Json(InsertedIdResponse { id }))
}
