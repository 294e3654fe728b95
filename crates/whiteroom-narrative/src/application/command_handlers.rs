//! Command handlers for the narrative engine.
//!
//! Each handler loads the session from the registry, runs the domain
//! transition and persists the result before returning. Content generation
//! is awaited before any mutation, so a failed or abandoned call leaves the
//! stored session untouched.

use serde::Serialize;
use tracing::{info, warn};
use whiteroom_core::clock::Clock;
use whiteroom_core::command::Command as _;
use whiteroom_core::error::DomainError;
use whiteroom_core::id::IdGenerator;

use crate::application::registry::{DEFAULT_HISTORY_WINDOW, SessionRegistry};
use crate::domain::aggregates::Session;
use crate::domain::commands::{
    ExecuteMetaCommand, InitializeSession, MetaAction, MetaCommand, MetaCommandResult,
    ProcessPlayerInput, SpawnNpc, WallType,
};
use crate::domain::effects::SystemEffect;
use crate::domain::events::{EventType, NarrativeEvent, reality_impact};
use crate::domain::generation::{CharacterProfile, ContentGenerator};
use crate::domain::world::World;

/// Result of narrating one player input.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerInputOutcome {
    /// Narrative text for the players.
    pub response: String,
    /// Effects the generator attached, in application order.
    pub effects: Vec<SystemEffect>,
    /// The event recorded for the input.
    pub event: NarrativeEvent,
}

/// A generated NPC and where it appears.
#[derive(Debug, Clone, Serialize)]
pub struct NpcSpawned {
    /// The generated character sheet.
    pub npc: CharacterProfile,
    /// Where the NPC appears.
    pub spawn_location: String,
}

/// Handles the `InitializeSession` command: opens a session in the White
/// Room and registers it.
///
/// # Errors
///
/// Returns `DomainError::Persistence` if the session cannot be stored.
pub async fn handle_initialize_session(
    command: &InitializeSession,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    registry: &SessionRegistry,
) -> Result<Session, DomainError> {
    let session = Session::initialize(
        ids.next_id("session"),
        command.architect_id.clone(),
        command.player_ids.iter().cloned(),
        ids.next_id("world"),
        clock.now(),
    );
    registry.save(&session).await?;

    info!(
        session_id = %session.id,
        architect_id = %session.architect_id,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "session initialized"
    );
    Ok(session)
}

/// Handles the `ProcessPlayerInput` command: narrates the input, records the
/// resulting event, applies effects and folds in coherence.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist,
/// `DomainError::ContentGeneration` if narration fails, or
/// `DomainError::Persistence` if any write fails.
pub async fn handle_process_player_input(
    command: &ProcessPlayerInput,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    registry: &SessionRegistry,
    generator: &dyn ContentGenerator,
) -> Result<PlayerInputOutcome, DomainError> {
    let mut session = registry.require(&command.session_id).await?;
    let history = registry
        .recent_history(&session.id, DEFAULT_HISTORY_WINDOW)
        .await?;

    let response = generator
        .narrate(&command.input, &command.character, &session.world_context(), &history)
        .await?;

    let now = clock.now();
    let event = NarrativeEvent {
        id: ids.next_id("event"),
        kind: EventType::classify(&command.input),
        actor_id: command.actor_id.clone(),
        content: command.input.clone(),
        timestamp: now,
        reality_impact: reality_impact(&command.input, response.system_effects.len()),
    };
    registry
        .append_history(&session.id, event.history_entry())
        .await?;
    session.record_event(event.clone())?;

    for effect in &response.system_effects {
        session.apply_effect(effect);
        session.touch(now);
        registry.save(&session).await?;
    }

    session.record_coherence(response.narrative_coherence);
    session.touch(now);
    registry.save(&session).await?;

    info!(
        session_id = %session.id,
        actor_id = %command.actor_id,
        event_type = %event.kind,
        effects = response.system_effects.len(),
        coherence = response.narrative_coherence,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "player input processed"
    );
    Ok(PlayerInputOutcome {
        response: response.content,
        effects: response.system_effects,
        event,
    })
}

/// Handles the `ExecuteMetaCommand` command. Commands flagged for audit are
/// refused without touching the session.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist,
/// `DomainError::ContentGeneration` if world synthesis fails, or
/// `DomainError::Persistence` if any write fails.
pub async fn handle_execute_meta_command(
    command: &ExecuteMetaCommand,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    registry: &SessionRegistry,
    generator: &dyn ContentGenerator,
) -> Result<MetaCommandResult, DomainError> {
    let mut session = registry.require(&command.session_id).await?;

    if command.command.requires_audit {
        warn!(
            session_id = %session.id,
            actor_id = %command.actor_id,
            command = %command.command.command,
            "meta-command held for audit"
        );
        return Ok(MetaCommandResult::audit_required());
    }

    let result =
        execute_unaudited(&mut session, &command.command, clock, ids, registry, generator).await?;
    info!(
        session_id = %session.id,
        actor_id = %command.actor_id,
        command = %command.command.command,
        success = result.success,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "meta-command executed"
    );
    Ok(result)
}

/// Runs a meta-command against `session` regardless of its audit flag and
/// persists every mutation.
pub(crate) async fn execute_unaudited(
    session: &mut Session,
    command: &MetaCommand,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    registry: &SessionRegistry,
    generator: &dyn ContentGenerator,
) -> Result<MetaCommandResult, DomainError> {
    let result = match command.action() {
        MetaAction::ForkTimeline(params) => {
            let id = ids.next_id("timeline");
            session.fork_timeline(id.clone(), params.branch_point, params.probability);
            MetaCommandResult::ok(format!("Timeline forked: {id}"))
        }
        MetaAction::ModifyWorld(params) => {
            session.modify_world(&params.modifications);
            MetaCommandResult::ok("World modified successfully")
        }
        MetaAction::RewritePast(params) => {
            if !session.rewrite_past(&params.event_id, params.new_content)? {
                return Ok(MetaCommandResult::rejected("Event not found in timeline"));
            }
            MetaCommandResult::ok("Past event rewritten")
        }
        MetaAction::SpawnWorld(params) => {
            let generated = generator
                .generate_world(
                    &params.genre,
                    Some(&session.current_world.name),
                    &params.constraints,
                )
                .await?;
            let world = World::nested(ids.next_id("world"), &session.current_world, generated);
            registry.save_world(&world).await?;
            session.enter_nested_world(&world, params.exit_conditions);
            MetaCommandResult::ok(format!("Nested world spawned: {}", world.name))
        }
        MetaAction::BreakFourthWall(params) => return Ok(break_fourth_wall(&params.wall_type)),
        MetaAction::Unknown { name } => {
            return Ok(MetaCommandResult::rejected(format!("Unknown meta-command: {name}")));
        }
        MetaAction::Invalid { name, reason } => {
            return Ok(MetaCommandResult::rejected(format!(
                "Invalid parameters for {name}: {reason}"
            )));
        }
    };

    session.touch(clock.now());
    registry.save(session).await?;
    Ok(result)
}

fn break_fourth_wall(wall_type: &WallType) -> MetaCommandResult {
    match wall_type {
        WallType::Narrative => MetaCommandResult::ok(
            "The boundary between story and reality blurs. The narrator acknowledges your presence.",
        ),
        WallType::System => MetaCommandResult::ok(
            "System access granted. The underlying game mechanics are now visible.",
        ),
        WallType::Meta => MetaCommandResult::ok(
            "You have broken through to the meta-layer. Reality becomes malleable.",
        ),
        WallType::Other(_) => MetaCommandResult::rejected("Unknown wall type"),
    }
}

/// Handles the `SpawnNpc` command: generates a character sheet for a session.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist or
/// `DomainError::ContentGeneration` if generation fails.
pub async fn handle_spawn_npc(
    command: &SpawnNpc,
    registry: &SessionRegistry,
    generator: &dyn ContentGenerator,
) -> Result<NpcSpawned, DomainError> {
    let session = registry.require(&command.session_id).await?;
    let npc = generator
        .generate_character(&command.backstory, &command.personality, &command.domain_weights)
        .await?;

    info!(
        session_id = %session.id,
        npc = %npc.name,
        location = %command.location,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "npc spawned"
    );
    Ok(NpcSpawned {
        npc,
        spawn_location: command.location.clone(),
    })
}
