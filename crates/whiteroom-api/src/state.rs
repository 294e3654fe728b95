//! Shared application state.

use std::fmt;
use std::sync::Arc;

use whiteroom_core::clock::Clock;
use whiteroom_core::id::IdGenerator;
use whiteroom_narrative::application::registry::SessionRegistry;
use whiteroom_narrative::domain::generation::ContentGenerator;

use crate::gateway::channels::ChannelHub;
use crate::gateway::locks::SessionLocks;

/// Application state shared across all request handlers and sockets.
#[derive(Clone)]
pub struct AppState {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Identifier source.
    pub ids: Arc<dyn IdGenerator>,
    /// Session registry over the configured store.
    pub registry: Arc<SessionRegistry>,
    /// Content generation backend.
    pub generator: Arc<dyn ContentGenerator>,
    /// Broadcast topics.
    pub hub: ChannelHub,
    /// Per-session serialization.
    pub locks: SessionLocks,
}

impl AppState {
    /// Create new application state with fresh topics and locks.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        registry: Arc<SessionRegistry>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            clock,
            ids,
            registry,
            generator,
            hub: ChannelHub::new(),
            locks: SessionLocks::new(),
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("hub", &self.hub)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
