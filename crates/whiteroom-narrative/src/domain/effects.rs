//! System effects produced by content generation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A state change requested by the content generator alongside a narrative
/// response.
///
/// Only [`SystemEffect::WorldChange`] and [`SystemEffect::CharacterUpdate`]
/// mutate state. Timeline forks and meta-commands are informational markers;
/// their real mutation goes through the meta-command path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemEffect {
    /// Merge `changes` into the current world's physics rules.
    WorldChange {
        /// What is being changed.
        #[serde(default)]
        target: String,
        /// Rule name → new description. May introduce new rules.
        #[serde(default)]
        changes: Map<String, Value>,
    },
    /// Merge `changes` into an existing character state.
    CharacterUpdate {
        /// Character identifier.
        #[serde(default)]
        target: String,
        /// Fields to overwrite in the character state.
        #[serde(default)]
        changes: Map<String, Value>,
    },
    /// Marker: the narrative suggests a timeline fork.
    TimelineFork {
        /// What is being forked.
        #[serde(default)]
        target: String,
        /// Free-form details.
        #[serde(default)]
        changes: Map<String, Value>,
    },
    /// Marker: the narrative suggests a meta-command.
    MetaCommand {
        /// What the command addresses.
        #[serde(default)]
        target: String,
        /// Free-form details.
        #[serde(default)]
        changes: Map<String, Value>,
    },
    /// An effect this engine does not recognize. Ignored when applied, but
    /// the payload is kept as received and serialized back unchanged.
    #[serde(untagged)]
    Unknown(Value),
}
