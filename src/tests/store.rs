use std::time::Duration;

use uuid::Uuid;

use crate::{
    db::{MemoryStore, RedisStore, SessionStore},
    error::StoreError,
    models::jwt::Identity,
};

#[tokio::test]
async fn test_memory_store_put_get_delete() {
    let store = MemoryStore::new();
    let session_id = Uuid::new_v4();

    store
        .put(session_id, Identity(42), Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(store.get(session_id).await, Ok(Identity(42)));
    assert_eq!(store.delete(session_id).await, Ok(1));
    assert_eq!(store.get(session_id).await, Err(StoreError::NotFound));
    assert_eq!(store.delete(session_id).await, Ok(0));
}

#[tokio::test]
async fn test_memory_store_unknown_session_is_not_found() {
    let store = MemoryStore::new();

    assert_eq!(store.get(Uuid::new_v4()).await, Err(StoreError::NotFound));
}

#[tokio::test]
async fn test_memory_store_entries_expire() {
    let store = MemoryStore::new();
    let session_id = Uuid::new_v4();

    store
        .put(session_id, Identity(1), Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(store.live_sessions(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(store.live_sessions(), 0);
    assert_eq!(store.get(session_id).await, Err(StoreError::NotFound));
    assert_eq!(store.delete(session_id).await, Ok(0));
}

#[tokio::test]
async fn test_memory_store_zero_ttl_writes_nothing() {
    let store = MemoryStore::new();
    let session_id = Uuid::new_v4();

    store.put(session_id, Identity(1), Duration::ZERO).await.unwrap();

    assert_eq!(store.get(session_id).await, Err(StoreError::NotFound));
}

#[tokio::test]
async fn test_redis_store_unreachable_is_unavailable() {
    // Nothing listens on port 1.
    let result = RedisStore::connect("redis://127.0.0.1:1", Duration::from_millis(500)).await;

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

#[tokio::test]
#[ignore = "requires a Redis server at REDIS_URL or redis://127.0.0.1:6379"]
async fn test_redis_store_round_trip() {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = RedisStore::connect(&url, Duration::from_secs(2)).await.unwrap();
    let session_id = Uuid::new_v4();

    store
        .put(session_id, Identity(42), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(store.get(session_id).await, Ok(Identity(42)));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.get(session_id).await, Err(StoreError::NotFound));

    let session_id = Uuid::new_v4();
    store
        .put(session_id, Identity(7), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(store.delete(session_id).await, Ok(1));
    assert_eq!(store.delete(session_id).await, Ok(0));
}
