//! Branching timelines, the recursion stack and per-session play state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::events::NarrativeEvent;
use super::world::PhysicsRules;

/// Identifier of the timeline every session starts on.
pub const MAIN_TIMELINE_ID: &str = "main_timeline";

/// Branch point recorded on the main timeline.
pub const SESSION_START_BRANCH_POINT: &str = "session_start";

/// Scene every session opens in.
pub const GROUND_STATE_SCENE: &str = "The White Room - Ground State";

/// Key under which overall narrative consistency is tracked.
pub const OVERALL_CONSISTENCY_CHECK: &str = "overall";

/// A branch of narrative causality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Timeline identifier.
    pub id: String,
    /// Where the branch diverged.
    pub branch_point: String,
    /// Events in the order they happened.
    pub events: Vec<NarrativeEvent>,
    /// Confidence weight in `[0, 1]`. Not normalized across timelines.
    pub probability: f64,
    /// Whether the timeline is live.
    pub is_active: bool,
}

impl Timeline {
    /// The root timeline of a new session.
    #[must_use]
    pub fn main() -> Self {
        Self::branch(MAIN_TIMELINE_ID.to_owned(), SESSION_START_BRANCH_POINT.to_owned(), 1.0)
    }

    /// A new, active, empty branch. `probability` is clamped into `[0, 1]`.
    #[must_use]
    pub fn branch(id: String, branch_point: String, probability: f64) -> Self {
        Self {
            id,
            branch_point,
            events: Vec::new(),
            probability: probability.clamp(0.0, 1.0),
            is_active: true,
        }
    }
}

/// One level of nested-world immersion.
///
/// Frames are pushed when a nested world is spawned. Exit conditions are
/// stored for external evaluation; nothing pops a frame yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecursionFrame {
    /// 1-based depth, equal to the frame's position in the stack.
    pub level: usize,
    /// The nested world entered.
    pub world_id: String,
    /// How entry occurred.
    pub entry_point: String,
    /// Physics rules of the nested world at entry.
    pub modified_rules: PhysicsRules,
    /// Conditions that would pop this frame if detected.
    pub exit_conditions: Vec<String>,
}

/// Mutable per-session play state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeState {
    /// Free-text description of the current scene.
    pub current_scene: String,
    /// All timelines, in creation order. At least one is active.
    pub active_timelines: Vec<Timeline>,
    /// Character identifier → opaque state blob.
    pub character_states: BTreeMap<String, Map<String, Value>>,
    /// Named consistency check → whether it currently holds.
    pub world_consistency: BTreeMap<String, bool>,
    /// Nested-world immersion chain; depth is its length.
    pub recursion_stack: Vec<RecursionFrame>,
}

impl NarrativeState {
    /// Ground state: one active main timeline, empty recursion stack.
    #[must_use]
    pub fn ground_state() -> Self {
        Self {
            current_scene: GROUND_STATE_SCENE.to_owned(),
            active_timelines: vec![Timeline::main()],
            character_states: BTreeMap::new(),
            world_consistency: BTreeMap::new(),
            recursion_stack: Vec::new(),
        }
    }

    /// The first active timeline.
    #[must_use]
    pub fn active_timeline(&self) -> Option<&Timeline> {
        self.active_timelines.iter().find(|t| t.is_active)
    }

    /// The first active timeline, mutably.
    pub fn active_timeline_mut(&mut self) -> Option<&mut Timeline> {
        self.active_timelines.iter_mut().find(|t| t.is_active)
    }

    /// Current nesting depth.
    #[must_use]
    pub fn recursion_depth(&self) -> usize {
        self.recursion_stack.len()
    }
}
