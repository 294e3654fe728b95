//! Session registry: a read-through/write-through cache over an expiring
//! key-value store.
//!
//! The in-process map is a fast path that is authoritative only until its
//! entry expires; the backing store is ground truth across restarts. Every
//! save refreshes the expiry window in both tiers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use whiteroom_core::clock::Clock;
use whiteroom_core::error::DomainError;
use whiteroom_core::store::KeyValueStore;

use crate::domain::aggregates::Session;
use crate::domain::audit::SystemAudit;
use crate::domain::world::World;

/// Expiry applied to every stored entry unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Hard cap on stored narrative history entries per session.
pub const HISTORY_CAP: usize = 50;

/// Number of history entries handed to the content generator.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

fn history_key(session_id: &str) -> String {
    format!("narrative_history:{session_id}")
}

fn world_key(world_id: &str) -> String {
    format!("world:{world_id}")
}

fn audits_key(session_id: &str) -> String {
    format!("audits:{session_id}")
}

#[derive(Debug, Clone)]
struct CachedSession {
    session: Session,
    expires_at: DateTime<Utc>,
}

/// Maps session ids to sessions and owns the per-session side records
/// (narrative history, nested worlds, audit ledger).
pub struct SessionRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, CachedSession>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Creates a registry over `store` with the given expiry window.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The expiry window applied to stored entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks a session up, in-process first and then in the backing store.
    /// An expired in-process entry is evicted on the way. Absence is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the backing store fails or holds
    /// an unreadable record.
    pub async fn get(&self, session_id: &str) -> Result<Option<Session>, DomainError> {
        let now = self.clock.now();
        let stale = {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(session_id) {
                Some(cached) if cached.expires_at > now => {
                    return Ok(Some(cached.session.clone()));
                }
                cached => cached.is_some(),
            }
        };
        if stale {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            if sessions
                .get(session_id)
                .is_some_and(|cached| cached.expires_at <= now)
            {
                sessions.remove(session_id);
            }
        }

        let Some(session) = self.load::<Session>(&session_key(session_id)).await? else {
            return Ok(None);
        };
        debug!(session_id, "session loaded from backing store");
        self.cache(session.clone(), now);
        Ok(Some(session))
    }

    /// Like [`SessionRegistry::get`], but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if no session is registered
    /// under `session_id`, or `DomainError::Persistence` on store failure.
    pub async fn require(&self, session_id: &str) -> Result<Session, DomainError> {
        self.get(session_id)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_owned()))
    }

    /// Writes `session` through to the backing store, then to the in-process
    /// map. The map is left untouched if the store write fails.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the backing store write fails.
    pub async fn save(&self, session: &Session) -> Result<(), DomainError> {
        self.store_json(&session_key(&session.id), session).await?;
        self.cache(session.clone(), self.clock.now());
        Ok(())
    }

    /// Appends one `"{type}: {content}"` entry to the session's history,
    /// evicting the oldest entries beyond [`HISTORY_CAP`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on store failure.
    pub async fn append_history(&self, session_id: &str, entry: String) -> Result<(), DomainError> {
        let key = history_key(session_id);
        let mut history: Vec<String> = self.load(&key).await?.unwrap_or_default();
        history.push(entry);
        if history.len() > HISTORY_CAP {
            let excess = history.len() - HISTORY_CAP;
            history.drain(..excess);
        }
        self.store_json(&key, &history).await
    }

    /// The most recent `limit` history entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on store failure.
    pub async fn recent_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, DomainError> {
        let mut history: Vec<String> = self.load(&history_key(session_id)).await?.unwrap_or_default();
        let skip = history.len().saturating_sub(limit);
        history.drain(..skip);
        Ok(history)
    }

    /// Persists a nested world so its parent link survives the session
    /// moving on.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on store failure.
    pub async fn save_world(&self, world: &World) -> Result<(), DomainError> {
        self.store_json(&world_key(&world.id), world).await
    }

    /// Loads a persisted nested world.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on store failure.
    pub async fn get_world(&self, world_id: &str) -> Result<Option<World>, DomainError> {
        self.load(&world_key(world_id)).await
    }

    /// The session's audit ledger, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on store failure.
    pub async fn load_audits(&self, session_id: &str) -> Result<Vec<SystemAudit>, DomainError> {
        Ok(self.load(&audits_key(session_id)).await?.unwrap_or_default())
    }

    /// Replaces the session's audit ledger.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on store failure.
    pub async fn save_audits(
        &self,
        session_id: &str,
        audits: &[SystemAudit],
    ) -> Result<(), DomainError> {
        self.store_json(&audits_key(session_id), audits).await
    }

    /// Drops in-process entries whose expiry has passed and returns how many
    /// were removed. The backing store expires its own copies.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, cached| cached.expires_at > now);
        before - sessions.len()
    }

    /// Number of sessions held in-process.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn cache(&self, session: Session, now: DateTime<Utc>) {
        let window = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.id.clone(), CachedSession { session, expires_at });
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomainError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| DomainError::Persistence(format!("corrupt record at {key}: {e}")))
    }

    async fn store_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DomainError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| DomainError::Persistence(format!("cannot encode {key}: {e}")))?;
        self.store.set_with_expiry(key, raw, self.ttl).await
    }
}
