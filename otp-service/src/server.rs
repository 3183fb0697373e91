//! Startup and shutdown sequencing.
//!
//! Startup walks the stores in a fixed order and fails fast; shutdown drains
//! in-flight requests up to the configured deadline.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use otp_service_api::{
    lifecycle::LifecycleManager,
    middleware::RequestTimeouts,
    observability::{init_metrics, TelemetryGuard},
    resilience::{drain_with_deadline, retry, LinearBackoff, ShutdownSignal},
    AppState,
};
use otp_service_core::AppConfig;
use otp_service_storage::{
    mongo, postgres, redis, MongoBenchmarkRepository, RedisBenchmarkRepository,
    TenantSettingsRepository,
};
use sqlx::PgPool;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info, warn};

/// Everything owned by a started server.
struct Running {
    lifecycle: Arc<LifecycleManager>,
    shutdown: ShutdownSignal,
    pool: PgPool,
    server: JoinHandle<io::Result<()>>,
}

pub async fn run(config: AppConfig, telemetry: TelemetryGuard) -> Result<()> {
    let lifecycle = Arc::new(LifecycleManager::new());

    let running = match start(&config, lifecycle).await {
        Ok(running) => running,
        Err(e) => {
            flush_telemetry(telemetry).await;
            return Err(e);
        }
    };

    running.serve_until_shutdown(&config, telemetry).await
}

async fn start(config: &AppConfig, lifecycle: Arc<LifecycleManager>) -> Result<Running> {
    let metrics = init_metrics().context("failed to install metrics recorder")?;

    let pool = postgres::create_pool(&config.database);
    let policy = LinearBackoff::new(
        config.database.connect_max_attempts as usize,
        config.database.connect_retry_delay,
    );
    retry("postgres_ping", &policy, || postgres::health_check(&pool))
        .await
        .context("PostgreSQL is unreachable")?;

    if config.database.run_migrations {
        postgres::migrate(&pool).await?;
    }

    let mut state = AppState::new(
        lifecycle.clone(),
        Arc::new(TenantSettingsRepository::new(pool.clone())),
        metrics,
    )
    .with_timeouts(RequestTimeouts::new(
        config.server.read_timeout,
        config.server.write_timeout,
    ));

    if config.redis.enabled {
        let conn = redis::connect(&config.redis).await?;
        state = state.with_redis(Arc::new(RedisBenchmarkRepository::new(conn)));
    } else {
        info!("Redis disabled, /v1/redis routes not mounted");
    }

    if config.mongo.enabled {
        let client = mongo::connect(&config.mongo).await?;
        state = state.with_mongo(Arc::new(MongoBenchmarkRepository::new(
            &client,
            &config.mongo.database,
            &config.mongo.collection,
        )));
    } else {
        info!("MongoDB disabled, /v1/mongo routes not mounted");
    }

    let app = otp_service_api::routes(state);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    info!(
        address = %address,
        read_timeout_ms = config.server.read_timeout.as_millis() as u64,
        write_timeout_ms = config.server.write_timeout.as_millis() as u64,
        idle_timeout_ms = config.server.idle_timeout.as_millis() as u64,
        "HTTP server listening"
    );

    let shutdown = ShutdownSignal::new();
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await
        })
    };

    lifecycle.mark_ready();

    Ok(Running {
        lifecycle,
        shutdown,
        pool,
        server,
    })
}

impl Running {
    async fn serve_until_shutdown(self, config: &AppConfig, telemetry: TelemetryGuard) -> Result<()> {
        let Running {
            lifecycle,
            shutdown,
            pool,
            mut server,
        } = self;

        tokio::select! {
            _ = shutdown.wait() => {}
            result = &mut server => {
                lifecycle.mark_shutdown();
                flush_telemetry(telemetry).await;
                pool.close().await;
                return match result {
                    Ok(Ok(())) => Err(anyhow::anyhow!("HTTP server exited unexpectedly")),
                    Ok(Err(e)) => Err(anyhow::Error::new(e).context("HTTP server failed")),
                    Err(e) => Err(anyhow::Error::new(e).context("HTTP server task failed")),
                };
            }
        }

        // The same signal stops the listener; only in-flight requests remain.
        lifecycle.mark_shutting_down();

        let deadline = config.server.graceful_shutdown_timeout;
        info!(deadline_ms = deadline.as_millis() as u64, "Draining in-flight requests");

        match drain_with_deadline(deadline, server).await {
            Ok(Ok(Ok(()))) => info!("HTTP server drained"),
            Ok(Ok(Err(e))) => warn!(error = %e, "HTTP server returned an error while draining"),
            Ok(Err(e)) => warn!(error = %e, "HTTP server task failed while draining"),
            Err(e) => {
                error!(error = %e, "Server forced to shutdown");
                lifecycle.mark_shutdown();
                flush_telemetry(telemetry).await;
                return Err(anyhow::Error::new(e).context("graceful shutdown failed"));
            }
        }

        lifecycle.mark_shutdown();
        flush_telemetry(telemetry).await;

        pool.close().await;
        info!("PostgreSQL pool closed");

        Ok(())
    }
}

/// The batch exporters block while flushing, so this runs off the async workers.
async fn flush_telemetry(telemetry: TelemetryGuard) {
    if let Err(e) = tokio::task::spawn_blocking(move || telemetry.shutdown()).await {
        error!(error = %e, "Telemetry shutdown task failed");
    }
}
