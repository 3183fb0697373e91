use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value stored by the latency benchmark routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BenchmarkEntry {
    pub key: String,
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BenchmarkEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// OTP payload stored by the benchmark routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtpRecord {
    pub tenant_id: String,
    pub phone_number: String,
    pub otp_code: String,
}

impl OtpRecord {
    /// Code written by the benchmark set routes.
    pub const BENCHMARK_CODE: &'static str = "123456";

    pub fn benchmark(tenant_id: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            phone_number: phone_number.into(),
            otp_code: Self::BENCHMARK_CODE.to_string(),
        }
    }

    /// Storage key shared by the Redis and MongoDB benchmarks.
    pub fn key(tenant_id: &str, phone_number: &str) -> String {
        format!("otp:{}:{}", tenant_id, phone_number)
    }
}
