use anyhow::{Context, Result};
use otp_service_core::config::RedisConfig;
use redis::aio::MultiplexedConnection;

/// Open a multiplexed connection and verify it with `PING`.
///
/// The returned connection is cheap to clone; every clone shares one socket.
pub async fn connect(config: &RedisConfig) -> Result<MultiplexedConnection> {
    let client = redis::Client::open(config.url()).context("invalid Redis connection settings")?;

    let mut conn = client
        .get_multiplexed_async_connection_with_timeouts(config.read_timeout, config.dial_timeout)
        .await
        .with_context(|| format!("failed to connect to Redis at {}:{}", config.host, config.port))?;

    health_check(&mut conn).await?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        db = config.db,
        "Redis connection established"
    );

    Ok(conn)
}

pub async fn health_check(conn: &mut MultiplexedConnection) -> Result<()> {
    let pong: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .context("Redis ping failed")?;

    tracing::debug!(reply = %pong, "Redis health check passed");
    Ok(())
}
