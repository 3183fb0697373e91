use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BenchmarkEntry, TenantSettings};
use crate::error::Result;

/// Read access to tenant settings plus the benchmark insert path.
#[async_trait]
pub trait TenantSettingsStore: Send + Sync {
    /// Returns `None` for unknown or soft-deleted rows.
    async fn find_by_id(&self, id: i64) -> Result<Option<TenantSettings>>;

    /// Inserts a fixed benchmark row tagged with `tenant_code` and returns its id.
    async fn insert_benchmark(&self, tenant_code: &str) -> Result<i64>;
}

/// Key-value store used by the latency benchmark routes.
#[async_trait]
pub trait BenchmarkStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Expired entries are reported as absent.
    async fn get(&self, key: &str) -> Result<Option<BenchmarkEntry>>;

    async fn delete(&self, key: &str) -> Result<()>;
}
