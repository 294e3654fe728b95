//! Broadcast topics for session and user fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use super::messages::ServerMessage;

/// Buffered messages per topic before slow subscribers start lagging.
pub const TOPIC_CAPACITY: usize = 64;

/// Topic carrying everything broadcast to a session's participants.
#[must_use]
pub fn session_topic(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Topic carrying messages addressed to one user.
#[must_use]
pub fn user_topic(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Named broadcast topics, created on first subscription.
#[derive(Debug, Clone, Default)]
pub struct ChannelHub {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<ServerMessage>>>>,
}

impl ChannelHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `topic`, creating it if needed.
    #[must_use]
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<ServerMessage> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Sends `message` to every current subscriber of `topic` and returns how
    /// many received it. Topics nobody listens to any more are dropped.
    pub fn publish(&self, topic: &str, message: ServerMessage) -> usize {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = topics.get(topic) else {
            return 0;
        };
        if let Ok(delivered) = sender.send(message) {
            delivered
        } else {
            topics.remove(topic);
            0
        }
    }

    /// Number of live topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
