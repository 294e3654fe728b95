//! Content-generation port.
//!
//! Narrative text, nested worlds, NPC sheets and audit advice all come from
//! an external generator (a language model in production). The engine only
//! sees the structured results defined here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use whiteroom_core::error::DomainError;

use super::commands::MetaCommand;
use super::effects::SystemEffect;
use super::world::PhysicsRules;

/// The character a player acts as. Only `id` and `name` are interpreted;
/// everything else is passed to the generator untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Character identifier, if the character is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Personality, stats, skills, backstory and anything else.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Structured reply to a player's narrative input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeResponse {
    /// Narrative text shown to players.
    pub content: String,
    /// The generator's reasoning trace. Never persisted.
    #[serde(default)]
    pub reasoning: String,
    /// State changes to apply, in order.
    #[serde(default)]
    pub system_effects: Vec<SystemEffect>,
    /// How well the input fits the story so far, in `[0, 100]`.
    pub narrative_coherence: f64,
}

/// A generated world, before it is given an id and a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedWorld {
    /// Display name.
    pub name: String,
    /// Genre tag.
    pub genre: String,
    /// Physics rules.
    #[serde(default)]
    pub physics_rules: PhysicsRules,
    /// Narrative rules.
    #[serde(default)]
    pub narrative_constraints: Vec<String>,
    /// Starting entropy.
    #[serde(default)]
    pub entropy_level: u32,
}

/// Advisory opinion on an audited meta-command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditAssessment {
    /// Whether the generator would allow the command.
    pub approved: bool,
    /// Why.
    pub reasoning: String,
    /// Suggested parameter overrides.
    #[serde(default)]
    pub modifications: Option<Map<String, Value>>,
}

/// External content-generation capability.
///
/// Implementations must return [`DomainError::ContentGeneration`] for empty,
/// malformed or otherwise unusable output rather than a default value.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Narrates a player's input against the world context and recent history.
    async fn narrate(
        &self,
        input: &str,
        character: &CharacterProfile,
        world_context: &str,
        history: &[String],
    ) -> Result<NarrativeResponse, DomainError>;

    /// Synthesizes a world of `genre`, nested inside `parent_world` if given.
    async fn generate_world(
        &self,
        genre: &str,
        parent_world: Option<&str>,
        constraints: &[String],
    ) -> Result<GeneratedWorld, DomainError>;

    /// Generates a character sheet for an NPC.
    async fn generate_character(
        &self,
        backstory: &str,
        personality: &str,
        domain_weights: &Map<String, Value>,
    ) -> Result<CharacterProfile, DomainError>;

    /// Gives advice on whether an audited command should run.
    async fn assess_audit(
        &self,
        command: &MetaCommand,
        player_justification: &str,
        world_context: &str,
    ) -> Result<AuditAssessment, DomainError>;
}
