use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::instrument;
use uuid::Uuid;

use super::SessionStore;
use crate::error::StoreError;
use crate::models::jwt::Identity;

/// In-process session store for tests and local development.
///
/// Expired entries are dropped lazily when touched, and otherwise behave as
/// absent. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<Uuid, (Identity, Instant)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that have not yet expired.
    #[cfg(test)]
    pub fn live_sessions(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    #[instrument(skip(self))]
    async fn put(
        &self,
        session_id: Uuid,
        identity: Identity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let deadline = Instant::now() + ttl;
        self.entries.write().insert(session_id, (identity, deadline));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, session_id: Uuid) -> Result<Identity, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get(&session_id) {
            Some((identity, deadline)) if *deadline > now => Ok(*identity),
            Some(_) => {
                entries.remove(&session_id);
                Err(StoreError::NotFound)
            }
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: Uuid) -> Result<u64, StoreError> {
        let now = Instant::now();
        match self.entries.write().remove(&session_id) {
            Some((_, deadline)) if deadline > now => Ok(1),
            _ => Ok(0),
        }
    }
}
