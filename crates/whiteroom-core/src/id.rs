//! Identifier generation abstraction for determinism.
//!
//! In production, identifiers are random UUIDs. In tests, a sequential
//! implementation is injected so that generated ids are predictable.

use uuid::Uuid;

/// Abstraction over opaque identifier generation.
pub trait IdGenerator: Send + Sync {
    /// Generate a fresh identifier carrying the given prefix, e.g.
    /// `timeline_…` or `world_…`.
    fn next_id(&self, prefix: &str) -> String;
}

/// Production generator backed by random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", Uuid::new_v4().simple())
    }
}
