use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::SessionStore;
use crate::error::StoreError;
use crate::models::jwt::Identity;

const KEY_PREFIX: &str = "session:";

/// Session store backed by Redis. Entries expire through `PX`, so Redis drops
/// them even if nothing ever asks again.
#[derive(Clone)]
pub struct RedisStore {
    con: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    #[instrument(skip(redis_url))]
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        info!("Initializing Redis connection");
        let client = Client::open(redis_url).map_err(|e| {
            error!(error = %e, "Failed to create Redis client");
            StoreError::from(e)
        })?;

        let mut con = with_timeout(timeout, client.get_connection_manager()).await?;

        let ping = redis::cmd("PING");
        with_timeout(timeout, ping.query_async::<_, String>(&mut con)).await?;

        info!("Redis connection established");
        Ok(Self { con, timeout })
    }

    fn key(session_id: Uuid) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    #[instrument(skip(self))]
    async fn put(
        &self,
        session_id: Uuid,
        identity: Identity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            warn!("Skipping session write with zero TTL");
            return Ok(());
        }

        let mut cmd = redis::cmd("SET");
        cmd.arg(Self::key(session_id))
            .arg(identity.0)
            .arg("PX")
            .arg(millis);

        let mut con = self.con.clone();
        with_timeout(self.timeout, cmd.query_async::<_, ()>(&mut con))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to store session in Redis"))
    }

    #[instrument(skip(self))]
    async fn get(&self, session_id: Uuid) -> Result<Identity, StoreError> {
        let mut con = self.con.clone();
        let value: Option<String> = with_timeout(self.timeout, con.get(Self::key(session_id)))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read session from Redis"))?;

        let Some(value) = value else {
            return Err(StoreError::NotFound);
        };

        value.parse::<i64>().map(Identity).map_err(|_| {
            error!("Corrupt session entry in Redis");
            StoreError::Unavailable("corrupt session entry".to_string())
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: Uuid) -> Result<u64, StoreError> {
        let mut con = self.con.clone();
        with_timeout(self.timeout, con.del::<_, u64>(Self::key(session_id)))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to delete session from Redis"))
    }
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Unavailable(format!(
            "redis call timed out after {timeout:?}"
        ))),
    }
}
