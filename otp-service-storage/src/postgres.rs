use anyhow::Result;
use otp_service_core::config::{DatabaseConfig, SslMode};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::time::Duration;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection options built from discrete settings, so passwords need no URL escaping.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode(config.ssl_mode))
}

fn ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Create a lazily connecting pool; callers verify reachability with [`health_check`].
pub fn create_pool(config: &DatabaseConfig) -> PgPool {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_open_conns)
        .min_connections(config.max_idle_conns.min(config.max_open_conns))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(Some(config.conn_max_idle_time))
        .max_lifetime(Some(config.conn_max_lifetime))
        .connect_lazy_with(connect_options(config));

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        max_connections = config.max_open_conns,
        min_connections = config.max_idle_conns,
        "PostgreSQL connection pool created"
    );

    pool
}

/// Run database migrations
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

/// Health check for database connection
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    tracing::debug!("Database health check passed");
    Ok(())
}

pub fn pool_status(pool: &PgPool) -> PoolStatus {
    let size = pool.size();
    let idle = pool.num_idle();
    PoolStatus {
        size,
        idle,
        active: (size as usize).saturating_sub(idle),
    }
}

#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub size: u32,
    pub idle: usize,
    pub active: usize,
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool(size: {}, active: {}, idle: {})",
            self.size, self.active, self.idle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lazy_pool_starts_empty() {
        let pool = create_pool(&DatabaseConfig::default());
        let status = pool_status(&pool);
        assert_eq!(status.size, 0);
        assert_eq!(status.active, 0);
        assert_eq!(status.to_string(), "Pool(size: 0, active: 0, idle: 0)");
    }

    #[test]
    fn connect_options_carry_settings() {
        let config = DatabaseConfig {
            host: "db.internal".to_string(),
            port: 6543,
            name: "otp".to_string(),
            ..Default::default()
        };
        let options = connect_options(&config);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("otp"));
    }
}
