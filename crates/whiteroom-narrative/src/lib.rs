//! WhiteRoom: narrative engine.
//!
//! Owns the per-session narrative state machine: the branching timeline
//! model, the nested-world recursion stack, entropy and coherence tracking,
//! the meta-command processor and its audit workflow, and the two-tier
//! session registry that persists all of it.

pub mod application;
pub mod domain;
