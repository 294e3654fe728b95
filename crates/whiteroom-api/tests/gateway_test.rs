//! Integration tests for gateway event handling.

mod common;

use std::sync::Arc;

use serde_json::{Map, Value, json};
use whiteroom_api::gateway::channels::{session_topic, user_topic};
use whiteroom_api::gateway::handlers::{
    self, DEFAULT_NPC_BACKSTORY, DEFAULT_SPAWN_LOCATION, NOT_A_MEMBER, NOT_THE_ARCHITECT,
    UNKNOWN_ARCHITECT_COMMAND,
};
use whiteroom_api::gateway::messages::{ClientMessage, ServerMessage};
use whiteroom_api::identity::{Actor, Role};
use whiteroom_api::state::AppState;
use whiteroom_narrative::domain::commands::MetaCommand;
use whiteroom_narrative::domain::effects::SystemEffect;

fn player(user_id: &str) -> Actor {
    Actor {
        user_id: user_id.to_owned(),
        role: Role::Player,
    }
}

fn architect(user_id: &str) -> Actor {
    Actor {
        user_id: user_id.to_owned(),
        role: Role::Architect,
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn error_of(reply: Option<ServerMessage>) -> (String, String) {
    match reply {
        Some(ServerMessage::Error { code, message }) => (code, message),
        other => panic!("expected an error reply, got {other:?}"),
    }
}

async fn session_with_players(state: &AppState) -> String {
    common::create_session(state, "arch-1", &["p1", "p2"]).await
}

#[tokio::test]
async fn test_join_session_replies_and_announces() {
    // Arrange
    let state = common::test_state();
    let session_id = session_with_players(&state).await;
    let mut feed = state.hub.subscribe(&session_topic(&session_id));

    // Act
    let dispatch = handlers::dispatch(
        &state,
        &player("p2"),
        ClientMessage::JoinSession {
            session_id: session_id.clone(),
        },
    )
    .await;

    // Assert
    assert_eq!(dispatch.joined.as_deref(), Some(session_id.as_str()));
    assert!(matches!(
        dispatch.reply,
        Some(ServerMessage::SessionJoined { ref session }) if session.id == session_id
    ));
    assert_eq!(
        feed.try_recv().unwrap(),
        ServerMessage::PlayerJoined {
            session_id,
            user_id: "p2".to_owned(),
        }
    );
}

#[tokio::test]
async fn test_join_session_rejects_strangers_and_missing_sessions() {
    let state = common::test_state();
    let session_id = session_with_players(&state).await;

    let stranger = handlers::dispatch(
        &state,
        &player("intruder"),
        ClientMessage::JoinSession { session_id },
    )
    .await;
    let missing = handlers::dispatch(
        &state,
        &player("p1"),
        ClientMessage::JoinSession {
            session_id: "session_missing".to_owned(),
        },
    )
    .await;

    assert!(stranger.joined.is_none());
    assert_eq!(
        error_of(stranger.reply),
        ("forbidden".to_owned(), NOT_A_MEMBER.to_owned())
    );
    assert_eq!(error_of(missing.reply).0, "session_not_found");
}

#[tokio::test]
async fn test_player_input_broadcasts_narrative_update() {
    // Arrange
    let effects = vec![SystemEffect::WorldChange {
        target: "physics".to_owned(),
        changes: params(json!({ "gravity": "Sideways" })),
    }];
    let state = common::test_state_with(common::ScriptedGenerator::with_effects(effects));
    let session_id = session_with_players(&state).await;
    let mut feed = state.hub.subscribe(&session_topic(&session_id));

    // Act
    let dispatch = handlers::dispatch(
        &state,
        &player("p1"),
        ClientMessage::PlayerInput {
            session_id: session_id.clone(),
            input: "I push against the wall".to_owned(),
            character: Default::default(),
        },
    )
    .await;

    // Assert
    assert!(dispatch.reply.is_none());
    let ServerMessage::NarrativeUpdate {
        actor_id,
        response,
        effects,
        event,
        ..
    } = feed.try_recv().unwrap()
    else {
        panic!("expected narrative_update");
    };
    assert_eq!(actor_id, "p1");
    assert_eq!(response, "The white walls ripple.");
    assert_eq!(effects.len(), 1);
    assert_eq!(event.content, "I push against the wall");

    let session = state.registry.require(&session_id).await.unwrap();
    assert_eq!(session.current_world.physics_rules["gravity"], "Sideways");
}

#[tokio::test]
async fn test_player_input_generation_failure_leaves_session_untouched() {
    // Arrange
    let state = common::test_state_with(common::ScriptedGenerator::unavailable());
    let session_id = session_with_players(&state).await;
    let before = state.registry.require(&session_id).await.unwrap();

    // Act
    let dispatch = handlers::dispatch(
        &state,
        &player("p1"),
        ClientMessage::PlayerInput {
            session_id: session_id.clone(),
            input: "Hello".to_owned(),
            character: Default::default(),
        },
    )
    .await;

    // Assert
    assert_eq!(error_of(dispatch.reply).0, "content_generation_failed");
    assert_eq!(state.registry.require(&session_id).await.unwrap(), before);
    assert!(
        state
            .registry
            .recent_history(&session_id, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_meta_command_without_audit_is_broadcast() {
    // Arrange
    let state = common::test_state();
    let session_id = session_with_players(&state).await;
    let mut feed = state.hub.subscribe(&session_topic(&session_id));
    let command = MetaCommand::new(
        "fork_timeline",
        params(json!({ "branch_point": "the stairwell" })),
    );

    // Act
    let dispatch = handlers::dispatch(
        &state,
        &player("p1"),
        ClientMessage::MetaCommand {
            session_id: session_id.clone(),
            command,
            justification: None,
        },
    )
    .await;

    // Assert
    assert!(dispatch.reply.is_none());
    let ServerMessage::MetaCommandResult { result, command, .. } = feed.try_recv().unwrap() else {
        panic!("expected meta_command_result");
    };
    assert_eq!(command, "fork_timeline");
    assert!(result.success);
    assert_eq!(result.message, "Timeline forked: timeline_3");
}

#[tokio::test]
async fn test_audited_meta_command_goes_to_the_architect() {
    // Arrange
    let state = common::test_state();
    let session_id = session_with_players(&state).await;
    let mut architect_inbox = state.hub.subscribe(&user_topic("arch-1"));
    let mut command = MetaCommand::new(
        "rewrite_past",
        params(json!({ "event_id": "event_9", "new_content": "It never happened" })),
    );
    command.requires_audit = true;

    // Act
    let dispatch = handlers::dispatch(
        &state,
        &player("p2"),
        ClientMessage::MetaCommand {
            session_id: session_id.clone(),
            command,
            justification: Some("Continuity error".to_owned()),
        },
    )
    .await;

    // Assert
    let Some(ServerMessage::MetaCommandResult { result, .. }) = dispatch.reply else {
        panic!("expected a meta_command_result reply");
    };
    assert!(result.needs_audit());

    let ServerMessage::AuditRequest { audit, .. } = architect_inbox.try_recv().unwrap() else {
        panic!("expected audit_request");
    };
    assert_eq!(audit.initiator_id, "p2");
    assert_eq!(audit.player_justification, "Continuity error");
    assert_eq!(state.registry.load_audits(&session_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_architect_commands_require_the_architect() {
    let state = common::test_state();
    let session_id = session_with_players(&state).await;

    let from_player = handlers::dispatch(
        &state,
        &player("arch-1"),
        ClientMessage::ArchitectCommand {
            session_id: session_id.clone(),
            command: "spawn_npc".to_owned(),
            parameters: Map::new(),
        },
    )
    .await;
    let from_other_architect = handlers::dispatch(
        &state,
        &architect("arch-2"),
        ClientMessage::ArchitectCommand {
            session_id,
            command: "spawn_npc".to_owned(),
            parameters: Map::new(),
        },
    )
    .await;

    assert_eq!(error_of(from_player.reply).1, NOT_THE_ARCHITECT);
    assert_eq!(error_of(from_other_architect.reply).1, NOT_THE_ARCHITECT);
}

#[tokio::test]
async fn test_modify_world_broadcasts_the_new_world() {
    // Arrange
    let state = common::test_state();
    let session_id = session_with_players(&state).await;
    let mut feed = state.hub.subscribe(&session_topic(&session_id));

    // Act
    handlers::dispatch(
        &state,
        &architect("arch-1"),
        ClientMessage::ArchitectCommand {
            session_id: session_id.clone(),
            command: "modify_world".to_owned(),
            parameters: params(json!({ "modifications": { "gravity": "Heavy as regret" } })),
        },
    )
    .await;

    // Assert
    let ServerMessage::WorldModified { result, world, .. } = feed.try_recv().unwrap() else {
        panic!("expected world_modified");
    };
    assert!(result.success);
    assert_eq!(world.physics_rules["gravity"], "Heavy as regret");
    assert_eq!(world.entropy_level, 1);
}

#[tokio::test]
async fn test_spawn_npc_uses_defaults() {
    // Arrange
    let generator = Arc::new(common::ScriptedGenerator::default());
    let state = common::test_state_observing(Arc::clone(&generator));
    let session_id = session_with_players(&state).await;
    let mut feed = state.hub.subscribe(&session_topic(&session_id));

    // Act
    handlers::dispatch(
        &state,
        &architect("arch-1"),
        ClientMessage::ArchitectCommand {
            session_id,
            command: "spawn_npc".to_owned(),
            parameters: Map::new(),
        },
    )
    .await;

    // Assert
    let ServerMessage::NpcSpawned {
        npc,
        spawn_location,
        ..
    } = feed.try_recv().unwrap()
    else {
        panic!("expected npc_spawned");
    };
    assert_eq!(npc.name, "The Archivist");
    assert_eq!(spawn_location, DEFAULT_SPAWN_LOCATION);
    let requests = generator.character_requests.lock().unwrap();
    assert_eq!(requests[0].0, DEFAULT_NPC_BACKSTORY);
}

#[tokio::test]
async fn test_unknown_architect_command_is_an_error() {
    let state = common::test_state();
    let session_id = session_with_players(&state).await;

    let dispatch = handlers::dispatch(
        &state,
        &architect("arch-1"),
        ClientMessage::ArchitectCommand {
            session_id,
            command: "delete_universe".to_owned(),
            parameters: Map::new(),
        },
    )
    .await;

    assert_eq!(
        error_of(dispatch.reply),
        (
            "unknown_command".to_owned(),
            UNKNOWN_ARCHITECT_COMMAND.to_owned()
        )
    );
}

#[tokio::test]
async fn test_audit_response_with_modifications_runs_modified_command() {
    // Arrange
    let state = common::test_state();
    let session_id = session_with_players(&state).await;
    let mut command = MetaCommand::new(
        "fork_timeline",
        params(json!({ "branch_point": "the vault", "probability": 0.9 })),
    );
    command.requires_audit = true;
    handlers::dispatch(
        &state,
        &player("p1"),
        ClientMessage::MetaCommand {
            session_id: session_id.clone(),
            command,
            justification: None,
        },
    )
    .await;
    let audit_id = state.registry.load_audits(&session_id).await.unwrap()[0]
        .id
        .clone();
    let mut feed = state.hub.subscribe(&session_topic(&session_id));

    // Act
    handlers::dispatch(
        &state,
        &architect("arch-1"),
        ClientMessage::AuditResponse {
            session_id: session_id.clone(),
            audit_id,
            approved: true,
            reasoning: Some("Only a sliver of a chance".to_owned()),
            modifications: Some(params(json!({ "probability": 0.1 }))),
        },
    )
    .await;

    // Assert
    let ServerMessage::AuditResolved {
        audit, execution, ..
    } = feed.try_recv().unwrap()
    else {
        panic!("expected audit_resolved");
    };
    assert_eq!(audit.resolution.map(|r| r.as_str()), Some("modified"));
    assert!(execution.unwrap().success);

    let session = state.registry.require(&session_id).await.unwrap();
    let fork = &session.narrative_state.active_timelines[1];
    assert!((fork.probability - 0.1).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_denied_audit_response_runs_nothing() {
    // Arrange
    let state = common::test_state();
    let session_id = session_with_players(&state).await;
    let mut command = MetaCommand::new("fork_timeline", params(json!({ "branch_point": "x" })));
    command.requires_audit = true;
    handlers::dispatch(
        &state,
        &player("p1"),
        ClientMessage::MetaCommand {
            session_id: session_id.clone(),
            command,
            justification: None,
        },
    )
    .await;
    let audit_id = state.registry.load_audits(&session_id).await.unwrap()[0]
        .id
        .clone();

    // Act
    let dispatch = handlers::dispatch(
        &state,
        &architect("arch-1"),
        ClientMessage::AuditResponse {
            session_id: session_id.clone(),
            audit_id,
            approved: false,
            reasoning: None,
            modifications: None,
        },
    )
    .await;

    // Assert
    assert!(dispatch.reply.is_none());
    let session = state.registry.require(&session_id).await.unwrap();
    assert_eq!(session.narrative_state.active_timelines.len(), 1);
}
