//! HTTP surface of the OTP service: routes, handlers, interceptors and
//! the observability stack behind them.

pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod resilience;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use otp_service_core::{BenchmarkStore, TenantSettingsStore};

use crate::handlers::{health, hello, mongo_benchmark, otp, redis_benchmark, tenant_settings};
use crate::lifecycle::LifecycleManager;
use crate::middleware::RequestTimeouts;
use crate::observability::metrics::{metrics_handler, METRICS_PATH};

pub use error::{ApiError, ApiResult};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<LifecycleManager>,
    pub tenant_settings: Arc<dyn TenantSettingsStore>,
    /// Absent when Redis is disabled; the Redis routes are then not mounted.
    pub redis: Option<Arc<dyn BenchmarkStore>>,
    /// Absent when MongoDB is disabled; the Mongo routes are then not mounted.
    pub mongo: Option<Arc<dyn BenchmarkStore>>,
    pub metrics: PrometheusHandle,
    pub timeouts: RequestTimeouts,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<LifecycleManager>,
        tenant_settings: Arc<dyn TenantSettingsStore>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            lifecycle,
            tenant_settings,
            redis: None,
            mongo: None,
            metrics,
            timeouts: RequestTimeouts::default(),
        }
    }

    pub fn with_redis(mut self, store: Arc<dyn BenchmarkStore>) -> Self {
        self.redis = Some(store);
        self
    }

    pub fn with_mongo(mut self, store: Arc<dyn BenchmarkStore>) -> Self {
        self.mongo = Some(store);
        self
    }

    pub fn with_timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Full application router with the interceptor pipeline applied.
pub fn routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        .route("/hello", get(hello::hello))
        .route("/delayed-hello", get(hello::delayed_hello))
        .route("/child-hello", get(hello::child_hello))
        .route("/test-error", get(hello::test_error))
        .route("/v1/otp/code", post(otp::generate_code))
        .route("/v1/otp/tenant-settings/:id", get(tenant_settings::get_by_id))
        .route(
            "/v1/otp/tenant-settings-insert-benchmark",
            post(tenant_settings::insert_benchmark),
        );

    if state.redis.is_some() {
        router = router
            .route("/v1/redis/otp/set", post(redis_benchmark::otp_set))
            .route("/v1/redis/otp/get", get(redis_benchmark::otp_get))
            .route("/v1/redis/set", post(redis_benchmark::set))
            .route("/v1/redis/get", get(redis_benchmark::get));
    }

    if state.mongo.is_some() {
        router = router
            .route("/v1/mongo/set", post(mongo_benchmark::set))
            .route("/v1/mongo/get", get(mongo_benchmark::get));
    }

    let timeouts = state.timeouts;
    let router = router
        .fallback(handlers::not_found)
        .with_state(state);

    middleware::apply(router, timeouts)
}
