//! Wire messages exchanged over the WebSocket gateway.
//!
//! Both directions are JSON objects tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use whiteroom_narrative::domain::aggregates::Session;
use whiteroom_narrative::domain::audit::SystemAudit;
use whiteroom_narrative::domain::commands::{MetaCommand, MetaCommandResult};
use whiteroom_narrative::domain::effects::SystemEffect;
use whiteroom_narrative::domain::events::NarrativeEvent;
use whiteroom_narrative::domain::generation::CharacterProfile;
use whiteroom_narrative::domain::world::World;

/// Events a connected client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a session's broadcasts.
    JoinSession {
        /// Target session.
        session_id: String,
    },
    /// Free-text player input to narrate.
    PlayerInput {
        /// Target session.
        session_id: String,
        /// Raw input text.
        input: String,
        /// The character the player acts as.
        #[serde(default)]
        character: CharacterProfile,
    },
    /// A meta-command to execute or, when flagged, to audit.
    MetaCommand {
        /// Target session.
        session_id: String,
        /// The command.
        command: MetaCommand,
        /// The player's case, used when the command is audited.
        #[serde(default)]
        justification: Option<String>,
    },
    /// An architect-only command.
    ArchitectCommand {
        /// Target session.
        session_id: String,
        /// `modify_world` or `spawn_npc`.
        command: String,
        /// Command parameters.
        #[serde(default)]
        parameters: Map<String, Value>,
    },
    /// The architect's answer to a pending audit.
    AuditResponse {
        /// Target session.
        session_id: String,
        /// The audit being answered.
        audit_id: String,
        /// Whether the command may run.
        approved: bool,
        /// The architect's reasoning.
        #[serde(default)]
        reasoning: Option<String>,
        /// Parameter overrides; turns an approval into a modification.
        #[serde(default)]
        modifications: Option<Map<String, Value>>,
    },
}

impl ClientMessage {
    /// The session this message targets.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::JoinSession { session_id }
            | Self::PlayerInput { session_id, .. }
            | Self::MetaCommand { session_id, .. }
            | Self::ArchitectCommand { session_id, .. }
            | Self::AuditResponse { session_id, .. } => session_id,
        }
    }

    /// The wire name of this message, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinSession { .. } => "join_session",
            Self::PlayerInput { .. } => "player_input",
            Self::MetaCommand { .. } => "meta_command",
            Self::ArchitectCommand { .. } => "architect_command",
            Self::AuditResponse { .. } => "audit_response",
        }
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to a client whose join succeeded.
    SessionJoined {
        /// The joined session.
        session: Box<Session>,
    },
    /// Broadcast when someone joins.
    PlayerJoined {
        /// The session joined.
        session_id: String,
        /// Who joined.
        user_id: String,
    },
    /// Broadcast after a player input is narrated.
    NarrativeUpdate {
        /// The session.
        session_id: String,
        /// Who acted.
        actor_id: String,
        /// What they wrote.
        input: String,
        /// The narration.
        response: String,
        /// Effects applied to the session.
        effects: Vec<SystemEffect>,
        /// The recorded event.
        event: NarrativeEvent,
    },
    /// Outcome of a meta-command.
    MetaCommandResult {
        /// The session.
        session_id: String,
        /// Who issued the command.
        actor_id: String,
        /// The command name.
        command: String,
        /// The outcome.
        result: MetaCommandResult,
    },
    /// Sent to the architect when a command awaits review.
    AuditRequest {
        /// The session.
        session_id: String,
        /// The pending audit.
        audit: SystemAudit,
    },
    /// Broadcast after an architect modifies the world.
    WorldModified {
        /// The session.
        session_id: String,
        /// The outcome.
        result: MetaCommandResult,
        /// The world after modification.
        world: Box<World>,
    },
    /// Broadcast after an NPC is generated.
    NpcSpawned {
        /// The session.
        session_id: String,
        /// The generated character sheet.
        npc: CharacterProfile,
        /// Where the NPC appears.
        spawn_location: String,
    },
    /// Broadcast after an audit is settled.
    AuditResolved {
        /// The session.
        session_id: String,
        /// The resolved audit.
        audit: SystemAudit,
        /// Result of running the command; absent when denied.
        execution: Option<MetaCommandResult>,
    },
    /// Sent to the client whose message failed.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl ServerMessage {
    /// An error addressed to the sender.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
