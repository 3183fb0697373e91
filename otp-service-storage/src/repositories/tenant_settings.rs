use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use otp_service_core::{benchmark_row, CoreError, Result, TenantSettings, TenantSettingsStore};
use sqlx::{PgPool, Row};

pub struct TenantSettingsRepository {
    pool: PgPool,
}

impl TenantSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get live (not soft-deleted) tenant settings by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<TenantSettings>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_code, name, status::text AS status, otp_enabled,
                   sms_provider::text AS sms_provider, sms_api_key, rate_limit_per_min,
                   signup_at, expires_at, timezone, metadata,
                   created_at, updated_at, deleted_at
            FROM tenant_settings
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_tenant_settings).transpose()
    }

    /// Insert one benchmark row into `tenant_settings_for_insert_new`
    pub async fn insert_for_benchmark(&self, tenant_code: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tenant_settings_for_insert_new (
                tenant_code, name, status, otp_enabled, sms_provider, sms_api_key,
                rate_limit_per_min, signup_at, expires_at, timezone, metadata,
                created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), NULL, $8, '{}'::jsonb, now(), now(), NULL)
            RETURNING id
            "#,
        )
        .bind(tenant_code)
        .bind(benchmark_row::NAME)
        .bind(benchmark_row::STATUS.as_str())
        .bind(benchmark_row::OTP_ENABLED)
        .bind(benchmark_row::SMS_PROVIDER.as_str())
        .bind(benchmark_row::SMS_API_KEY)
        .bind(benchmark_row::RATE_LIMIT_PER_MIN)
        .bind(benchmark_row::TIMEZONE)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl TenantSettingsStore for TenantSettingsRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<TenantSettings>> {
        self.get_by_id(id).await
    }

    async fn insert_benchmark(&self, tenant_code: &str) -> Result<i64> {
        self.insert_for_benchmark(tenant_code).await
    }
}

fn row_to_tenant_settings(row: sqlx::postgres::PgRow) -> Result<TenantSettings> {
    let status: String = row.try_get("status")?;
    let sms_provider: String = row.try_get("sms_provider")?;
    let metadata: Option<serde_json::Value> = row.try_get("metadata")?;
    let signup_at: DateTime<Utc> = row.try_get("signup_at")?;

    Ok(TenantSettings {
        id: row.try_get("id")?,
        tenant_code: row.try_get("tenant_code")?,
        name: row.try_get("name")?,
        status: stored_enum("status", &status)?,
        otp_enabled: row.try_get("otp_enabled")?,
        sms_provider: stored_enum("sms_provider", &sms_provider)?,
        sms_api_key: row.try_get("sms_api_key")?,
        rate_limit_per_min: row.try_get("rate_limit_per_min")?,
        signup_at,
        expires_at: row.try_get("expires_at")?,
        timezone: row.try_get("timezone")?,
        metadata: metadata.unwrap_or_else(|| serde_json::json!({})),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// A stored value outside the enum is a database fault, not bad input.
fn stored_enum<T>(column: &str, raw: &str) -> Result<T>
where
    T: FromStr<Err = CoreError>,
{
    raw.parse()
        .map_err(|e: CoreError| CoreError::Database(format!("column {column}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otp_service_core::{SmsProvider, TenantStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn known_enum_values_parse() {
        assert_eq!(stored_enum::<TenantStatus>("status", "suspended").unwrap(), TenantStatus::Suspended);
        assert_eq!(stored_enum::<SmsProvider>("sms_provider", "twilio").unwrap(), SmsProvider::Twilio);
    }

    #[test]
    fn unknown_enum_values_are_database_errors() {
        match stored_enum::<TenantStatus>("status", "frozen") {
            Err(CoreError::Database(msg)) => {
                assert!(msg.contains("column status"));
                assert!(msg.contains("frozen"));
            }
            other => panic!("expected a database error, got {other:?}"),
        }

        assert!(matches!(
            stored_enum::<SmsProvider>("sms_provider", "pigeon"),
            Err(CoreError::Database(_))
        ));
    }
}
