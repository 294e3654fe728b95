//! Gateway event handling, independent of the socket transport.
//!
//! Each client message is authorized, run through the narrative engine
//! under the session's lock, and fanned out through the channel hub.
//! Whatever should go back to the sender alone is returned in [`Dispatch`].

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use whiteroom_core::error::DomainError;
use whiteroom_narrative::application::{audit_handlers, command_handlers};
use whiteroom_narrative::domain::aggregates::Session;
use whiteroom_narrative::domain::audit::AuditResolution;
use whiteroom_narrative::domain::commands::{
    ExecuteMetaCommand, MetaCommand, ProcessPlayerInput, RequestAudit, ResolveAudit, SpawnNpc,
};
use whiteroom_narrative::domain::generation::CharacterProfile;

use super::channels::{session_topic, user_topic};
use super::messages::{ClientMessage, ServerMessage};
use crate::error::classify;
use crate::identity::Actor;
use crate::state::AppState;

/// Sent when the caller is neither architect nor player of the session.
pub const NOT_A_MEMBER: &str = "Not authorized for this session";

/// Sent when an architect-only event comes from anyone else.
pub const NOT_THE_ARCHITECT: &str = "Not authorized";

/// Sent for architect commands other than `modify_world` and `spawn_npc`.
pub const UNKNOWN_ARCHITECT_COMMAND: &str = "Unknown architect command";

/// NPC backstory used when the architect gives none.
pub const DEFAULT_NPC_BACKSTORY: &str = "A mysterious figure in the White Room";

/// NPC personality used when the architect gives none.
pub const DEFAULT_NPC_PERSONALITY: &str = "Enigmatic and helpful";

/// Where NPCs appear unless told otherwise.
pub const DEFAULT_SPAWN_LOCATION: &str = "current scene";

/// What handling one message produced for its sender.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatch {
    /// Message for the sender only.
    pub reply: Option<ServerMessage>,
    /// Session whose topic the sender should now follow.
    pub joined: Option<String>,
}

impl Dispatch {
    fn reply(message: ServerMessage) -> Self {
        Self {
            reply: Some(message),
            joined: None,
        }
    }
}

/// A refused or failed message, reported to the sender as `error`.
#[derive(Debug)]
struct Rejection {
    code: &'static str,
    message: String,
}

impl Rejection {
    fn forbidden(message: &str) -> Self {
        Self {
            code: "forbidden",
            message: message.to_owned(),
        }
    }
}

impl From<DomainError> for Rejection {
    fn from(err: DomainError) -> Self {
        let (_, code) = classify(&err);
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Handles one client message on behalf of `actor`.
pub async fn dispatch(state: &AppState, actor: &Actor, message: ClientMessage) -> Dispatch {
    let kind = message.kind();
    let session_id = message.session_id().to_owned();
    let handled = match message {
        ClientMessage::JoinSession { session_id } => join_session(state, actor, session_id).await,
        ClientMessage::PlayerInput {
            session_id,
            input,
            character,
        } => player_input(state, actor, session_id, input, character).await,
        ClientMessage::MetaCommand {
            session_id,
            command,
            justification,
        } => meta_command(state, actor, session_id, command, justification).await,
        ClientMessage::ArchitectCommand {
            session_id,
            command,
            parameters,
        } => architect_command(state, actor, session_id, command, parameters).await,
        ClientMessage::AuditResponse {
            session_id,
            audit_id,
            approved,
            reasoning,
            modifications,
        } => {
            let resolution = match (approved, &modifications) {
                (true, Some(overrides)) if !overrides.is_empty() => AuditResolution::Modified,
                (true, _) => AuditResolution::Approved,
                (false, _) => AuditResolution::Denied,
            };
            audit_response(state, actor, session_id, audit_id, resolution, reasoning, modifications)
                .await
        }
    };

    handled.unwrap_or_else(|rejection| {
        warn!(
            event = kind,
            session_id = %session_id,
            actor_id = %actor.user_id,
            code = rejection.code,
            message = %rejection.message,
            "gateway event rejected"
        );
        Dispatch::reply(ServerMessage::error(rejection.code, rejection.message))
    })
}

fn ensure_member(session: &Session, actor: &Actor) -> Result<(), Rejection> {
    if session.is_member(&actor.user_id) {
        Ok(())
    } else {
        Err(Rejection::forbidden(NOT_A_MEMBER))
    }
}

fn ensure_architect(session: &Session, actor: &Actor) -> Result<(), Rejection> {
    if actor.is_architect_of(session) {
        Ok(())
    } else {
        Err(Rejection::forbidden(NOT_THE_ARCHITECT))
    }
}

fn text_param(parameters: &Map<String, Value>, key: &str, default: &str) -> String {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_owned()
}

#[instrument(skip(state, actor), fields(actor_id = %actor.user_id))]
async fn join_session(
    state: &AppState,
    actor: &Actor,
    session_id: String,
) -> Result<Dispatch, Rejection> {
    let session = state.registry.require(&session_id).await?;
    ensure_member(&session, actor)?;

    state.hub.publish(
        &session_topic(&session.id),
        ServerMessage::PlayerJoined {
            session_id: session.id.clone(),
            user_id: actor.user_id.clone(),
        },
    );
    info!("session joined");

    Ok(Dispatch {
        reply: Some(ServerMessage::SessionJoined {
            session: Box::new(session),
        }),
        joined: Some(session_id),
    })
}

#[instrument(skip(state, actor, input, character), fields(actor_id = %actor.user_id))]
async fn player_input(
    state: &AppState,
    actor: &Actor,
    session_id: String,
    input: String,
    character: CharacterProfile,
) -> Result<Dispatch, Rejection> {
    let _guard = state.locks.lock(&session_id).await;
    let session = state.registry.require(&session_id).await?;
    ensure_member(&session, actor)?;

    let command = ProcessPlayerInput {
        correlation_id: Uuid::new_v4(),
        session_id: session.id,
        actor_id: actor.user_id.clone(),
        input,
        character,
    };
    let outcome = command_handlers::handle_process_player_input(
        &command,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
        state.generator.as_ref(),
    )
    .await?;

    state.hub.publish(
        &session_topic(&command.session_id),
        ServerMessage::NarrativeUpdate {
            session_id: command.session_id.clone(),
            actor_id: command.actor_id,
            input: command.input,
            response: outcome.response,
            effects: outcome.effects,
            event: outcome.event,
        },
    );
    Ok(Dispatch::default())
}

#[instrument(skip(state, actor, command, justification), fields(actor_id = %actor.user_id, command = %command.command))]
async fn meta_command(
    state: &AppState,
    actor: &Actor,
    session_id: String,
    command: MetaCommand,
    justification: Option<String>,
) -> Result<Dispatch, Rejection> {
    let _guard = state.locks.lock(&session_id).await;
    let session = state.registry.require(&session_id).await?;
    ensure_member(&session, actor)?;

    let execute = ExecuteMetaCommand {
        correlation_id: Uuid::new_v4(),
        session_id: session.id.clone(),
        actor_id: actor.user_id.clone(),
        command,
    };
    let result = command_handlers::handle_execute_meta_command(
        &execute,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
        state.generator.as_ref(),
    )
    .await?;

    let summary = ServerMessage::MetaCommandResult {
        session_id: session.id.clone(),
        actor_id: actor.user_id.clone(),
        command: execute.command.command.clone(),
        result: result.clone(),
    };

    if !result.needs_audit() {
        state.hub.publish(&session_topic(&session.id), summary);
        return Ok(Dispatch::default());
    }

    let request = RequestAudit {
        correlation_id: execute.correlation_id,
        session_id: session.id.clone(),
        initiator_id: actor.user_id.clone(),
        command: execute.command,
        player_justification: justification.unwrap_or_default(),
    };
    let audit = audit_handlers::handle_request_audit(
        &request,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
        state.generator.as_ref(),
    )
    .await?;

    let delivered = state.hub.publish(
        &user_topic(&session.architect_id),
        ServerMessage::AuditRequest {
            session_id: session.id.clone(),
            audit,
        },
    );
    if delivered == 0 {
        warn!(architect_id = %session.architect_id, "architect not connected; audit left pending");
    }
    Ok(Dispatch::reply(summary))
}

#[instrument(skip(state, actor, parameters), fields(actor_id = %actor.user_id))]
async fn architect_command(
    state: &AppState,
    actor: &Actor,
    session_id: String,
    command: String,
    parameters: Map<String, Value>,
) -> Result<Dispatch, Rejection> {
    let _guard = state.locks.lock(&session_id).await;
    let session = state.registry.require(&session_id).await?;
    ensure_architect(&session, actor)?;

    match command.as_str() {
        "modify_world" => {
            let execute = ExecuteMetaCommand {
                correlation_id: Uuid::new_v4(),
                session_id: session.id.clone(),
                actor_id: actor.user_id.clone(),
                command: MetaCommand::new("modify_world", parameters),
            };
            let result = command_handlers::handle_execute_meta_command(
                &execute,
                state.clock.as_ref(),
                state.ids.as_ref(),
                &state.registry,
                state.generator.as_ref(),
            )
            .await?;
            let world = state.registry.require(&session.id).await?.current_world;

            state.hub.publish(
                &session_topic(&session.id),
                ServerMessage::WorldModified {
                    session_id: session.id.clone(),
                    result,
                    world: Box::new(world),
                },
            );
            Ok(Dispatch::default())
        }
        "spawn_npc" => {
            let spawn = SpawnNpc {
                correlation_id: Uuid::new_v4(),
                session_id: session.id.clone(),
                backstory: text_param(&parameters, "backstory", DEFAULT_NPC_BACKSTORY),
                personality: text_param(&parameters, "personality", DEFAULT_NPC_PERSONALITY),
                domain_weights: parameters
                    .get("domain_weights")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                location: text_param(&parameters, "location", DEFAULT_SPAWN_LOCATION),
            };
            let spawned = command_handlers::handle_spawn_npc(
                &spawn,
                &state.registry,
                state.generator.as_ref(),
            )
            .await?;

            state.hub.publish(
                &session_topic(&session.id),
                ServerMessage::NpcSpawned {
                    session_id: session.id.clone(),
                    npc: spawned.npc,
                    spawn_location: spawned.spawn_location,
                },
            );
            Ok(Dispatch::default())
        }
        _ => Err(Rejection {
            code: "unknown_command",
            message: UNKNOWN_ARCHITECT_COMMAND.to_owned(),
        }),
    }
}

#[instrument(skip(state, actor, reasoning, modifications), fields(actor_id = %actor.user_id))]
async fn audit_response(
    state: &AppState,
    actor: &Actor,
    session_id: String,
    audit_id: String,
    resolution: AuditResolution,
    reasoning: Option<String>,
    modifications: Option<Map<String, Value>>,
) -> Result<Dispatch, Rejection> {
    let _guard = state.locks.lock(&session_id).await;
    let session = state.registry.require(&session_id).await?;
    ensure_architect(&session, actor)?;

    let resolve = ResolveAudit {
        correlation_id: Uuid::new_v4(),
        session_id: session.id.clone(),
        audit_id,
        resolution,
        reasoning,
        modifications,
    };
    let outcome = audit_handlers::handle_resolve_audit(
        &resolve,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
        state.generator.as_ref(),
    )
    .await?;

    state.hub.publish(
        &session_topic(&session.id),
        ServerMessage::AuditResolved {
            session_id: session.id.clone(),
            audit: outcome.audit,
            execution: outcome.execution,
        },
    );
    Ok(Dispatch::default())
}
