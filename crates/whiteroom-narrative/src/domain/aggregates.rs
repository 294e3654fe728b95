//! The session aggregate and its transition rules.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use whiteroom_core::error::DomainError;

use super::effects::SystemEffect;
use super::events::NarrativeEvent;
use super::timeline::{NarrativeState, OVERALL_CONSISTENCY_CHECK, RecursionFrame, Timeline};
use super::world::World;

/// Coherence strictly above this marks the narrative as consistent.
const CONSISTENT_COHERENCE: f64 = 70.0;

/// Coherence strictly below this destabilizes the world.
const DESTABILIZING_COHERENCE: f64 = 50.0;

/// Entropy added by a world modification.
const MODIFY_WORLD_ENTROPY: u32 = 1;

/// Entropy added by rewriting the past.
const REWRITE_PAST_ENTROPY: u32 = 2;

/// Entry point recorded for worlds entered through `spawn_world`.
pub const SPAWN_ENTRY_POINT: &str = "spawn_command";

/// The root aggregate of one live play instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: String,
    /// The owning architect.
    pub architect_id: String,
    /// Participants. May include the architect.
    pub player_ids: BTreeSet<String>,
    /// The world play currently happens in.
    pub current_world: World,
    /// Mutable play state.
    pub narrative_state: NarrativeState,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Opens a session in the White Room on its main timeline.
    #[must_use]
    pub fn initialize(
        id: String,
        architect_id: String,
        player_ids: impl IntoIterator<Item = String>,
        world_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            architect_id,
            player_ids: player_ids.into_iter().collect(),
            current_world: World::white_room(world_id),
            narrative_state: NarrativeState::ground_state(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `actor_id` is the architect or a listed player.
    #[must_use]
    pub fn is_member(&self, actor_id: &str) -> bool {
        self.architect_id == actor_id || self.player_ids.contains(actor_id)
    }

    /// Whether `actor_id` owns the session.
    #[must_use]
    pub fn is_architect(&self, actor_id: &str) -> bool {
        self.architect_id == actor_id
    }

    /// Marks the session as changed.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Textual snapshot of the world and play state handed to the content
    /// generator.
    #[must_use]
    pub fn world_context(&self) -> String {
        let world = &self.current_world;
        let state = &self.narrative_state;
        let rules = serde_json::to_string(&world.physics_rules).unwrap_or_default();

        let mut context = String::new();
        let _ = writeln!(context, "Current World: {} ({})", world.name, world.genre);
        let _ = writeln!(context, "Physics Rules: {rules}");
        let _ = writeln!(context, "Entropy Level: {}", world.entropy_level);
        let _ = writeln!(context, "Active Timelines: {}", state.active_timelines.len());
        let _ = writeln!(context, "Recursion Depth: {}", state.recursion_depth());
        let _ = write!(context, "Current Scene: {}", state.current_scene);
        context
    }

    /// Appends `event` to the active timeline.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no timeline is active.
    pub fn record_event(&mut self, event: NarrativeEvent) -> Result<(), DomainError> {
        let timeline = self
            .narrative_state
            .active_timeline_mut()
            .ok_or_else(no_active_timeline)?;
        timeline.events.push(event);
        Ok(())
    }

    /// Applies one generated effect. Returns whether anything changed.
    ///
    /// World changes may introduce new physics rules. Character updates only
    /// touch characters that already have state. Fork and meta-command
    /// markers are no-ops here.
    pub fn apply_effect(&mut self, effect: &SystemEffect) -> bool {
        match effect {
            SystemEffect::WorldChange { changes, .. } => {
                merge(&mut self.current_world.physics_rules, changes);
                !changes.is_empty()
            }
            SystemEffect::CharacterUpdate { target, changes } => {
                match self.narrative_state.character_states.get_mut(target) {
                    Some(state) => {
                        merge(state, changes);
                        true
                    }
                    None => false,
                }
            }
            SystemEffect::TimelineFork { .. }
            | SystemEffect::MetaCommand { .. }
            | SystemEffect::Unknown(_) => false,
        }
    }

    /// Folds a coherence score in `[0, 100]` into consistency and entropy.
    pub fn record_coherence(&mut self, coherence: f64) {
        self.narrative_state
            .world_consistency
            .insert(OVERALL_CONSISTENCY_CHECK.to_owned(), coherence > CONSISTENT_COHERENCE);
        if coherence < DESTABILIZING_COHERENCE {
            self.current_world.destabilize(1);
        }
    }

    /// Appends a new active timeline. Existing timelines are untouched.
    pub fn fork_timeline(&mut self, id: String, branch_point: String, probability: f64) -> &Timeline {
        let timelines = &mut self.narrative_state.active_timelines;
        timelines.push(Timeline::branch(id, branch_point, probability));
        &timelines[timelines.len() - 1]
    }

    /// Overwrites physics rules that already exist; unknown keys are ignored.
    /// Entropy rises regardless. Returns how many rules changed.
    pub fn modify_world(&mut self, modifications: &Map<String, Value>) -> usize {
        let rules = &mut self.current_world.physics_rules;
        let mut applied = 0;
        for (key, value) in modifications {
            if let Some(rule) = rules.get_mut(key) {
                *rule = value.clone();
                applied += 1;
            }
        }
        self.current_world.destabilize(MODIFY_WORLD_ENTROPY);
        applied
    }

    /// Rewrites an event on the active timeline. Returns `false`, without
    /// touching entropy, if the event is not on it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no timeline is active.
    pub fn rewrite_past(&mut self, event_id: &str, new_content: String) -> Result<bool, DomainError> {
        let timeline = self
            .narrative_state
            .active_timeline_mut()
            .ok_or_else(no_active_timeline)?;
        let Some(event) = timeline.events.iter_mut().find(|e| e.id == event_id) else {
            return Ok(false);
        };
        event.rewrite(new_content);
        self.current_world.destabilize(REWRITE_PAST_ENTROPY);
        Ok(true)
    }

    /// Registers `nested` as a child of the current world and pushes a
    /// recursion frame for it.
    pub fn enter_nested_world(&mut self, nested: &World, exit_conditions: Vec<String>) -> &RecursionFrame {
        self.current_world.nested_world_ids.push(nested.id.clone());
        let stack = &mut self.narrative_state.recursion_stack;
        stack.push(RecursionFrame {
            level: stack.len() + 1,
            world_id: nested.id.clone(),
            entry_point: SPAWN_ENTRY_POINT.to_owned(),
            modified_rules: nested.physics_rules.clone(),
            exit_conditions,
        });
        &stack[stack.len() - 1]
    }
}

fn merge<M>(target: &mut M, changes: &Map<String, Value>)
where
    M: Extend<(String, Value)>,
{
    target.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
}

fn no_active_timeline() -> DomainError {
    DomainError::Validation("no active timeline".to_owned())
}
