use std::time::Duration;

use async_trait::async_trait;
use otp_service_core::{BenchmarkEntry, BenchmarkStore, CoreError, Result};
use redis::aio::MultiplexedConnection;

/// Benchmark store backed by Redis native key expiry.
#[derive(Clone)]
pub struct RedisBenchmarkRepository {
    conn: MultiplexedConnection,
}

impl RedisBenchmarkRepository {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

fn cache_error(err: redis::RedisError) -> CoreError {
    CoreError::Cache(err.to_string())
}

/// Millisecond TTL for `SET ... PX`; never zero.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl BenchmarkStore for RedisBenchmarkRepository {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<BenchmarkEntry>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(value.map(|value| BenchmarkEntry::new(key, value)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}
