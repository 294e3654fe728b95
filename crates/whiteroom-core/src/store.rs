//! Expiring key-value store abstraction.
//!
//! Sessions, narrative history and audit ledgers are persisted as JSON
//! documents in a store whose entries expire unless refreshed. Any store with
//! TTL support satisfies this contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DomainError;

/// Durable, time-expiring key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Load the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Store `value` under `key`, replacing any previous value and resetting
    /// its expiry to `ttl` from now.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), DomainError>;
}
