#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use otp_service_api::{
    lifecycle::{LifecycleManager, LifecycleState},
    observability::init_metrics,
    AppState,
};
use otp_service_core::{
    BenchmarkEntry, BenchmarkStore, CoreError, Result, SmsProvider, TenantSettings,
    TenantSettingsStore, TenantStatus,
};
use serde_json::Value;
use tower::ServiceExt;

// ===== Fakes =====

#[derive(Default)]
pub struct FakeTenantSettingsStore {
    rows: Mutex<HashMap<i64, TenantSettings>>,
    inserted: Mutex<Vec<String>>,
    failing: bool,
}

impl FakeTenantSettingsStore {
    pub fn with_rows(rows: Vec<TenantSettings>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().map(|r| (r.id, r)).collect()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn inserted_codes(&self) -> Vec<String> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TenantSettingsStore for FakeTenantSettingsStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<TenantSettings>> {
        if self.failing {
            return Err(CoreError::Database("connection refused (10.0.0.5:5432)".into()));
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&id).filter(|row| !row.is_deleted()).cloned())
    }

    async fn insert_benchmark(&self, tenant_code: &str) -> Result<i64> {
        if self.failing {
            return Err(CoreError::Database("connection refused (10.0.0.5:5432)".into()));
        }
        let mut inserted = self.inserted.lock().unwrap();
        inserted.push(tenant_code.to_string());
        Ok(1000 + inserted.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryBenchmarkStore {
    entries: Mutex<HashMap<String, BenchmarkEntry>>,
}

impl InMemoryBenchmarkStore {
    /// Stores an entry verbatim, bypassing TTL handling.
    pub fn insert_raw(&self, entry: BenchmarkEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.key.clone(), entry);
    }

    pub fn raw(&self, key: &str) -> Option<BenchmarkEntry> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BenchmarkStore for InMemoryBenchmarkStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CoreError::Cache(e.to_string()))?;
        let entry = BenchmarkEntry::new(key, value).with_expiry(Utc::now() + ttl);
        self.entries.lock().unwrap().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<BenchmarkEntry>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ===== Fixtures =====

pub fn tenant_settings(id: i64) -> TenantSettings {
    let signup = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    TenantSettings {
        id,
        tenant_code: format!("test-tenant-{id:03}"),
        name: "Test Tenant".to_string(),
        status: TenantStatus::Active,
        otp_enabled: true,
        sms_provider: SmsProvider::Other,
        sms_api_key: None,
        rate_limit_per_min: 60,
        signup_at: signup,
        expires_at: None,
        timezone: "UTC".to_string(),
        metadata: serde_json::json!({ "test": "data" }),
        created_at: signup,
        updated_at: signup,
        deleted_at: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub lifecycle: Arc<LifecycleManager>,
    pub tenant_settings: Arc<FakeTenantSettingsStore>,
    pub redis: Arc<InMemoryBenchmarkStore>,
    pub mongo: Arc<InMemoryBenchmarkStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(FakeTenantSettingsStore::with_rows(vec![tenant_settings(1)]))
    }

    pub fn with_store(store: FakeTenantSettingsStore) -> Self {
        let lifecycle = Arc::new(LifecycleManager::new());
        lifecycle.set_state(LifecycleState::Ready);
        let tenant_settings = Arc::new(store);
        let redis = Arc::new(InMemoryBenchmarkStore::default());
        let mongo = Arc::new(InMemoryBenchmarkStore::default());

        let state = AppState::new(
            lifecycle.clone(),
            tenant_settings.clone(),
            init_metrics().unwrap(),
        )
        .with_redis(redis.clone())
        .with_mongo(mongo.clone());

        Self {
            router: otp_service_api::routes(state),
            lifecycle,
            tenant_settings,
            redis,
            mongo,
        }
    }

    /// Router without the optional Redis and MongoDB stores.
    pub fn without_benchmark_stores() -> Router {
        let lifecycle = Arc::new(LifecycleManager::new());
        let state = AppState::new(
            lifecycle,
            Arc::new(FakeTenantSettingsStore::default()),
            init_metrics().unwrap(),
        );
        otp_service_api::routes(state)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str) -> Response {
        self.send(Request::post(uri).body(Body::empty()).unwrap()).await
    }
}

// ===== Helpers =====

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
