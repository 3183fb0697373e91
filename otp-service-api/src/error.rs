use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use otp_service_core::CoreError;
use serde::Serialize;
use thiserror::Error;

pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Client-safe error with an explicit status.
    #[error("{message}")]
    Application {
        status: StatusCode,
        message: String,
        details: Option<String>,
    },

    /// Never shown to clients; the text only reaches the log.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Application {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Application { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => ErrorReport {
                status: self.status(),
                message: msg.clone(),
                details: None,
                internal: None,
            },
            ApiError::Application {
                status,
                message,
                details,
            } => ErrorReport {
                status: *status,
                message: message.clone(),
                details: details.clone(),
                internal: None,
            },
            ApiError::Internal(detail) => ErrorReport::internal(detail.clone()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => ApiError::BadRequest(msg),
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Error description carried on the response for the error-handling
/// interceptor, which writes the final body and logs it once.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
    pub internal: Option<String>,
}

impl ErrorReport {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: GENERIC_INTERNAL_MESSAGE.to_string(),
            details: None,
            internal: Some(detail.into()),
        }
    }

    pub fn body(&self, request_id: Option<&str>) -> ErrorBody {
        ErrorBody {
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: self.message.clone(),
            code: self.status.as_u16(),
            details: self.details.clone(),
            request_id: request_id.map(str::to_string),
        }
    }

    pub fn into_http_response(self, request_id: Option<&str>) -> Response {
        let body = self.body(request_id);
        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Standard error payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.report().into_http_response(None)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
