use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct OtpCodeResponse {
    pub code: String,
}

pub async fn generate_code() -> ApiResult<Json<OtpCodeResponse>> {
    let code = otp_service_core::otp::generate_code().map_err(|e| {
        tracing::error!(error = %e, "OTP generation failed");
        ApiError::with_status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate OTP code")
    })?;

    Ok(Json(OtpCodeResponse { code }))
}
