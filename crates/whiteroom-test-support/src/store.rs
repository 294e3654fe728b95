//! Test stores: mock `KeyValueStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use whiteroom_core::error::DomainError;
use whiteroom_core::store::KeyValueStore;

/// A non-expiring store that keeps values in memory and records every write
/// together with the TTL it was given.
#[derive(Debug, Default)]
pub struct RecordingKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, Duration)>>,
    failing_prefix: Mutex<Option<String>>,
}

impl RecordingKeyValueStore {
    /// Create an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all `(key, ttl)` pairs written so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn writes(&self) -> Vec<(String, Duration)> {
        self.writes.lock().unwrap().clone()
    }

    /// Returns the raw value currently stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Makes writes to keys starting with `prefix` fail until
    /// [`RecordingKeyValueStore::recover`] is called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_writes_under(&self, prefix: &str) {
        *self.failing_prefix.lock().unwrap() = Some(prefix.to_owned());
    }

    /// Lets every write through again.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn recover(&self) {
        *self.failing_prefix.lock().unwrap() = None;
    }
}

#[async_trait]
impl KeyValueStore for RecordingKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        if let Some(prefix) = self.failing_prefix.lock().unwrap().as_deref() {
            if key.starts_with(prefix) {
                return Err(DomainError::Persistence(format!("write to {key} refused")));
            }
        }
        self.values.lock().unwrap().insert(key.to_owned(), value);
        self.writes.lock().unwrap().push((key.to_owned(), ttl));
        Ok(())
    }
}

/// A store that always returns a persistence error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingKeyValueStore;

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: String,
        _ttl: Duration,
    ) -> Result<(), DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }
}
