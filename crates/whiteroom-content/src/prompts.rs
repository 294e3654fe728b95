//! Prompt construction for each generation task.

use serde_json::{Map, Value};
use whiteroom_narrative::domain::commands::MetaCommand;
use whiteroom_narrative::domain::generation::CharacterProfile;

/// History entries included in a narrative prompt.
pub const NARRATIVE_HISTORY_WINDOW: usize = 5;

/// A generation task and its sampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Narrate a player's input.
    Narrative,
    /// Synthesize a world.
    World,
    /// Generate an NPC sheet.
    Character,
    /// Advise on an audited meta-command.
    Audit,
}

impl Task {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::World => "world",
            Self::Character => "character",
            Self::Audit => "audit",
        }
    }

    /// The system message for this task.
    #[must_use]
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Narrative => {
                "You narrate the White Room, a recursive role-playing space where players can \
                 rewrite reality, fork timelines and address the system directly. \
                 Reply with a single JSON object and nothing else."
            }
            Self::World => {
                "You design worlds for the White Room. Worlds nest inside one another and must \
                 support stories that know they are stories. \
                 Reply with a single JSON object and nothing else."
            }
            Self::Character => {
                "You create characters for the White Room, where narrative coherence and \
                 meta-awareness matter as much as strength. \
                 Reply with a single JSON object and nothing else."
            }
            Self::Audit => {
                "You audit reality-altering requests in the White Room, weighing what the player \
                 wants against the stability of the story. \
                 Reply with a single JSON object and nothing else."
            }
        }
    }

    /// Sampling temperature.
    #[must_use]
    pub fn temperature(self) -> f32 {
        match self {
            Self::Narrative => 0.7,
            Self::World | Self::Character => 0.8,
            Self::Audit => 0.3,
        }
    }

    /// Completion token limit.
    #[must_use]
    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Narrative => 2000,
            Self::World | Self::Character => 1500,
            Self::Audit => 1000,
        }
    }
}

/// User prompt for a narrative turn. Only the last
/// [`NARRATIVE_HISTORY_WINDOW`] history entries are included.
#[must_use]
pub fn narrative(
    input: &str,
    character: &CharacterProfile,
    world_context: &str,
    history: &[String],
) -> String {
    let recent = &history[history.len().saturating_sub(NARRATIVE_HISTORY_WINDOW)..];
    let character = serde_json::to_string(character).unwrap_or_default();
    format!(
        "Player input: {input}\n\
         Character: {character}\n\
         World context:\n{world_context}\n\
         Recent history:\n{}\n\n\
         Judge how well the input fits the story, how much it changes the world, and whether \
         it reaches for meta-commands or the fourth wall. Respond with:\n\
         {{\"content\": \"narrative response\", \"reasoning\": \"your reasoning\", \
         \"system_effects\": [{{\"type\": \"world_change|character_update|timeline_fork|meta_command\", \
         \"target\": \"what changes\", \"changes\": {{}}}}], \"narrative_coherence\": 0-100}}",
        recent.join("\n"),
    )
}

/// User prompt for world synthesis.
#[must_use]
pub fn world(genre: &str, parent_world: Option<&str>, constraints: &[String]) -> String {
    let parent = parent_world.unwrap_or("none; this is a root world");
    let constraints = if constraints.is_empty() {
        "none".to_owned()
    } else {
        constraints.join("; ")
    };
    format!(
        "Genre: {genre}\n\
         Parent world: {parent}\n\
         Constraints: {constraints}\n\n\
         Design a world that can sit inside its parent. Respond with:\n\
         {{\"name\": \"world name\", \"genre\": \"{genre}\", \"physics_rules\": {{\"gravity\": \"...\", \
         \"magic\": \"...\", \"technology\": \"...\", \"meta_physics\": \"...\"}}, \
         \"narrative_constraints\": [\"...\"], \"entropy_level\": 0-10}}"
    )
}

/// User prompt for an NPC sheet.
#[must_use]
pub fn character(backstory: &str, personality: &str, domain_weights: &Map<String, Value>) -> String {
    let weights = Value::Object(domain_weights.clone());
    format!(
        "Backstory: {backstory}\n\
         Personality: {personality}\n\
         Domain weights: {weights}\n\n\
         Respond with:\n\
         {{\"name\": \"character name\", \"backstory\": \"expanded backstory\", \
         \"personality_kernel\": {{\"openness\": 0-100, \"conscientiousness\": 0-100, \
         \"extraversion\": 0-100, \"agreeableness\": 0-100, \"neuroticism\": 0-100}}, \
         \"stats\": {{\"narrative_coherence\": 0-100, \"reality_anchor\": 0-100, \
         \"recursion_depth\": 0-10, \"fourth_wall_permeability\": 0-100}}, \
         \"meta_skills\": [{{\"name\": \"...\", \"type\": \"loopback|fork_thread|editor_access|system_audit\", \
         \"level\": 1-10, \"description\": \"...\"}}]}}"
    )
}

/// User prompt for audit advice.
#[must_use]
pub fn audit(command: &MetaCommand, player_justification: &str, world_context: &str) -> String {
    let command = serde_json::to_string(command).unwrap_or_default();
    format!(
        "Requested command: {command}\n\
         Player justification: {player_justification}\n\
         World context:\n{world_context}\n\n\
         Weigh narrative coherence, balance, player agency and stability. Respond with:\n\
         {{\"approved\": true, \"reasoning\": \"why\", \"modifications\": {{}}}}"
    )
}
