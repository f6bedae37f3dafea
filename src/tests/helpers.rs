use std::sync::{
    Arc, Once,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tower::ServiceExt;
use tracing::{Level, info};
use tracing_subscriber::fmt::format::FmtSpan;
use uuid::Uuid;

use crate::{
    AppState,
    config::AuthConfig,
    create_router,
    db::{MemoryStore, SessionStore},
    error::StoreError,
    models::jwt::Identity,
    services::{auth_service::AuthService, session_service::SessionAuthority},
};

static INIT: Once = Once::new();

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

// Lowest cost bcrypt accepts; keeps hashing fast in tests.
const TEST_BCRYPT_COST: u32 = 4;

/// Initialize logging exactly once
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_target(false)
            .with_thread_ids(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::ERROR)
            .with_span_events(FmtSpan::NONE)
            .init();
    });
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        access_secret: ACCESS_SECRET.to_string(),
        refresh_secret: REFRESH_SECRET.to_string(),
        access_ttl: Duration::from_secs(15 * 60),
        refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
    }
}

pub fn short_lived_auth_config() -> AuthConfig {
    AuthConfig {
        access_ttl: Duration::from_secs(1),
        refresh_ttl: Duration::from_secs(1),
        ..test_auth_config()
    }
}

pub fn test_authority(config: &AuthConfig, store: Arc<dyn SessionStore>) -> SessionAuthority {
    init_tracing();
    SessionAuthority::new(config, store)
}

pub async fn setup_test_db() -> SqlitePool {
    init_tracing();
    info!("Setting up test database");

    // A single connection, otherwise every pooled connection gets its own
    // in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn create_test_app() -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let app = create_test_app_with_store(Arc::new(store.clone())).await;
    (app, store)
}

pub async fn create_test_app_with_store(store: Arc<dyn SessionStore>) -> Router {
    let pool = setup_test_db().await;

    let state = AppState {
        sessions: Arc::new(SessionAuthority::new(&test_auth_config(), store)),
        credentials: AuthService::new(pool, TEST_BCRYPT_COST),
    };

    create_router(state)
}

pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        format!("Bearer {token}").parse().expect("valid header"),
    );
    headers
}

pub async fn test_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: Option<HeaderMap>,
) -> (StatusCode, Value) {
    info!(method = %method, uri = %uri, "Making test request");

    let body = match body {
        Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
        None => Body::empty(),
    };

    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(custom_headers) = headers {
        for (key, value) in custom_headers.iter() {
            request = request.header(key, value);
        }
    }

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    info!(status = %status, body = %body, "Test response received");
    (status, body)
}

/// Wraps a `MemoryStore` and starts failing writes after `healthy_puts`
/// successful ones, or every call once `outage` is set.
pub struct FlakyStore {
    inner: MemoryStore,
    healthy_puts: usize,
    puts: AtomicUsize,
    outage: AtomicBool,
}

impl FlakyStore {
    pub fn failing_after(healthy_puts: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            healthy_puts,
            puts: AtomicUsize::new(0),
            outage: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn put(
        &self,
        session_id: Uuid,
        identity: Identity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.check()?;
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.healthy_puts {
            return Err(StoreError::Unavailable("write failed".to_string()));
        }
        self.inner.put(session_id, identity, ttl).await
    }

    async fn get(&self, session_id: Uuid) -> Result<Identity, StoreError> {
        self.check()?;
        self.inner.get(session_id).await
    }

    async fn delete(&self, session_id: Uuid) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.delete(session_id).await
    }
}
