//! Integration tests for `PgKeyValueStore`.
//!
//! These need a live database: `DATABASE_URL=... cargo test -- --ignored`.

use std::time::Duration;

use sqlx::PgPool;
use whiteroom_core::store::KeyValueStore;
use whiteroom_session_store::pg_store::PgKeyValueStore;

// --- get ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_get_returns_none_for_missing_key(pool: PgPool) {
    let store = PgKeyValueStore::new(pool);

    let value = store.get("session:missing").await.unwrap();

    assert!(value.is_none());
}

// --- set_with_expiry + get round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_set_then_get_returns_latest_value(pool: PgPool) {
    let store = PgKeyValueStore::new(pool);
    let ttl = Duration::from_secs(3600);

    store
        .set_with_expiry("session:s1", r#"{"id":"s1"}"#.to_owned(), ttl)
        .await
        .unwrap();
    store
        .set_with_expiry("session:s1", r#"{"id":"s1","v":2}"#.to_owned(), ttl)
        .await
        .unwrap();

    let value = store.get("session:s1").await.unwrap();
    assert_eq!(value.as_deref(), Some(r#"{"id":"s1","v":2}"#));
}

// --- expiry ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_expired_entries_are_hidden_and_purged(pool: PgPool) {
    let store = PgKeyValueStore::new(pool);

    store
        .set_with_expiry("session:gone", "{}".to_owned(), Duration::ZERO)
        .await
        .unwrap();

    assert!(store.get("session:gone").await.unwrap().is_none());
    assert_eq!(store.purge_expired().await.unwrap(), 1);
}
