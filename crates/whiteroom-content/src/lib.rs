//! WhiteRoom: content generation.
//!
//! Implements the narrative engine's `ContentGenerator` port over an
//! OpenAI-compatible chat-completions endpoint. Every task asks for a
//! JSON-only reply, which is decoded strictly into the engine's types.

pub mod client;
pub mod prompts;
pub mod reply;

pub use client::{OpenAiConfig, OpenAiContentGenerator};
