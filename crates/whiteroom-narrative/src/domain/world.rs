//! Worlds: reality/ruleset nodes arranged in a tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::generation::GeneratedWorld;

/// Rule name → free-form description of how that rule behaves.
pub type PhysicsRules = BTreeMap<String, Value>;

/// Name given to the root world synthesized for every new session.
pub const WHITE_ROOM_NAME: &str = "The White Room";

/// Genre tag of the root world.
pub const META_REALITY_GENRE: &str = "meta-reality";

/// A reality node with its own physics and narrative constraints.
///
/// Worlds form a tree: nested worlds are only ever created as children of an
/// existing world and are never re-parented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// World identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Genre tag.
    pub genre: String,
    /// Parent world, `None` for a root world.
    pub parent_world_id: Option<String>,
    /// Child worlds, in spawn order.
    pub nested_world_ids: Vec<String>,
    /// Mutable physics rules.
    pub physics_rules: PhysicsRules,
    /// Ordered narrative rules.
    pub narrative_constraints: Vec<String>,
    /// Narrative instability. Only ever nudged upwards.
    pub entropy_level: u32,
}

impl World {
    /// Synthesizes the default root world every session starts in.
    #[must_use]
    pub fn white_room(id: String) -> Self {
        let physics_rules = [
            ("gravity", "Optional; it exists only once acknowledged"),
            ("magic", "Reality bends to narrative assertion"),
            ("technology", "An interface to the AI substrate"),
            ("meta_physics", "The fourth wall is permeable; the system can be addressed directly"),
            ("entropy", "Contradictions collapse probability"),
            ("recursion", "Depth is unbounded, limited only by narrative coherence"),
        ]
        .into_iter()
        .map(|(rule, description)| (rule.to_owned(), Value::from(description)))
        .collect();

        Self {
            id,
            name: WHITE_ROOM_NAME.to_owned(),
            genre: META_REALITY_GENRE.to_owned(),
            parent_world_id: None,
            nested_world_ids: Vec::new(),
            physics_rules,
            narrative_constraints: vec![
                "Nothing exists until it is spoken or claimed".to_owned(),
                "Contradictions fork the timeline".to_owned(),
                "Meta-commands are subject to system audit".to_owned(),
                "Reality anchors keep recursion finite".to_owned(),
            ],
            entropy_level: 0,
        }
    }

    /// Builds a child world of `parent` from a generated payload.
    #[must_use]
    pub fn nested(id: String, parent: &World, generated: GeneratedWorld) -> Self {
        Self {
            id,
            name: generated.name,
            genre: generated.genre,
            parent_world_id: Some(parent.id.clone()),
            nested_world_ids: Vec::new(),
            physics_rules: generated.physics_rules,
            narrative_constraints: generated.narrative_constraints,
            entropy_level: generated.entropy_level,
        }
    }

    /// Raises entropy by `amount`.
    pub fn destabilize(&mut self, amount: u32) {
        self.entropy_level = self.entropy_level.saturating_add(amount);
    }
}
