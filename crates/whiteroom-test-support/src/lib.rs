//! Shared test doubles and utilities for the WhiteRoom narrative engine.

mod clock;
mod id;
mod store;

pub use clock::{FixedClock, ManualClock};
pub use id::SequenceIdGenerator;
pub use store::{FailingKeyValueStore, RecordingKeyValueStore};
