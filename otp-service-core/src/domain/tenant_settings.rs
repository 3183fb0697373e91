use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
            TenantStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for TenantStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "inactive" => Ok(TenantStatus::Inactive),
            "suspended" => Ok(TenantStatus::Suspended),
            other => Err(CoreError::Validation(format!("unknown tenant status: {}", other))),
        }
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SmsProvider {
    Kavenegar,
    Twilio,
    Ghasedak,
    Other,
}

impl SmsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsProvider::Kavenegar => "kavenegar",
            SmsProvider::Twilio => "twilio",
            SmsProvider::Ghasedak => "ghasedak",
            SmsProvider::Other => "other",
        }
    }
}

impl FromStr for SmsProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kavenegar" => Ok(SmsProvider::Kavenegar),
            "twilio" => Ok(SmsProvider::Twilio),
            "ghasedak" => Ok(SmsProvider::Ghasedak),
            "other" => Ok(SmsProvider::Other),
            other => Err(CoreError::Validation(format!("unknown sms provider: {}", other))),
        }
    }
}

impl fmt::Display for SmsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tenant OTP delivery settings. Soft-deleted rows carry `deleted_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantSettings {
    pub id: i64,
    pub tenant_code: String,
    pub name: String,
    pub status: TenantStatus,
    pub otp_enabled: bool,
    pub sms_provider: SmsProvider,
    pub sms_api_key: Option<String>,
    pub rate_limit_per_min: i32,
    pub signup_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub timezone: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TenantSettings {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fixed column values written by the insert benchmark.
pub mod benchmark_row {
    pub const NAME: &str = "Benchmark Tenant";
    pub const STATUS: super::TenantStatus = super::TenantStatus::Active;
    pub const OTP_ENABLED: bool = true;
    pub const SMS_PROVIDER: super::SmsProvider = super::SmsProvider::Other;
    pub const SMS_API_KEY: &str = "eac566da612f3f0b551895235e6f4a29";
    pub const RATE_LIMIT_PER_MIN: i32 = 60;
    pub const TIMEZONE: &str = "UTC";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_round_trips_through_text() {
        for status in [TenantStatus::Active, TenantStatus::Inactive, TenantStatus::Suspended] {
            assert_eq!(status.as_str().parse::<TenantStatus>().unwrap(), status);
        }
        assert!("archived".parse::<TenantStatus>().is_err());
    }

    #[test]
    fn provider_serializes_lowercase() {
        let json = serde_json::to_string(&SmsProvider::Kavenegar).unwrap();
        assert_eq!(json, "\"kavenegar\"");
        assert!("sendgrid".parse::<SmsProvider>().is_err());
    }

    #[test]
    fn nullable_fields_serialize_as_null() {
        let now = Utc::now();
        let settings = TenantSettings {
            id: 1,
            tenant_code: "acme".to_string(),
            name: "Acme".to_string(),
            status: TenantStatus::Active,
            otp_enabled: true,
            sms_provider: SmsProvider::Twilio,
            sms_api_key: None,
            rate_limit_per_min: 30,
            signup_at: now,
            expires_at: None,
            timezone: "UTC".to_string(),
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let value = serde_json::to_value(&settings).unwrap();
        assert!(value["sms_api_key"].is_null());
        assert!(value["expires_at"].is_null());
        assert!(value["deleted_at"].is_null());
        assert_eq!(value["status"], "active");
        assert!(!settings.is_deleted());
    }
}
