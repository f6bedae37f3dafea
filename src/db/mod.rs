use std::time::Duration;

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::jwt::Identity;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Key-value record of live sessions: `session id -> identity`, each entry
/// expiring on its own.
///
/// Implementations must make each call atomic per key. Callers only ever
/// create, read or unconditionally delete, never read-modify-write.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(
        &self,
        session_id: Uuid,
        identity: Identity,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    async fn get(&self, session_id: Uuid) -> Result<Identity, StoreError>;

    /// Returns how many entries were removed (0 or 1).
    async fn delete(&self, session_id: Uuid) -> Result<u64, StoreError>;
}

pub async fn create_db_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new().connect(database_url).await?;
    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}
