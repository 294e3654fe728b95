//! Commands for the narrative engine and the meta-command vocabulary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use whiteroom_core::command::Command;

use super::audit::AuditResolution;
use super::generation::CharacterProfile;

/// A reality-altering command as it travels over the wire and is stored in
/// audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaCommand {
    /// Command name, e.g. `fork_timeline`.
    pub command: String,
    /// Command-specific parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Whether the architect must approve the command first.
    #[serde(default)]
    pub requires_audit: bool,
    /// Access level claimed by the issuer.
    #[serde(default)]
    pub system_access_level: u8,
}

impl MetaCommand {
    /// Creates an unaudited command.
    #[must_use]
    pub fn new(command: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            command: command.into(),
            parameters,
            requires_audit: false,
            system_access_level: 0,
        }
    }

    /// Interprets the name and parameters as a typed action.
    #[must_use]
    pub fn action(&self) -> MetaAction {
        let name = self.command.as_str();
        let parsed = match name {
            "fork_timeline" => self.params().map(MetaAction::ForkTimeline),
            "modify_world" => self.params().map(MetaAction::ModifyWorld),
            "rewrite_past" => self.params().map(MetaAction::RewritePast),
            "spawn_world" => self.params().map(MetaAction::SpawnWorld),
            "break_fourth_wall" => self.params().map(MetaAction::BreakFourthWall),
            _ => {
                return MetaAction::Unknown {
                    name: name.to_owned(),
                };
            }
        };
        parsed.unwrap_or_else(|e| MetaAction::Invalid {
            name: name.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Returns a copy whose parameters are overlaid with `overrides`.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Map<String, Value>) -> Self {
        let mut command = self.clone();
        for (key, value) in overrides {
            command.parameters.insert(key.clone(), value.clone());
        }
        command
    }

    fn params<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.parameters.clone()))
    }
}

fn default_branch_point() -> String {
    "current".to_owned()
}

fn default_probability() -> f64 {
    0.5
}

/// Reads an optional parameter; `null` or a value of the wrong shape counts
/// as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_branch_point<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient(deserializer)?.unwrap_or_else(default_branch_point))
}

fn lenient_probability<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(lenient(deserializer)?.unwrap_or_else(default_probability))
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Parameters of `fork_timeline`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForkTimeline {
    /// Where the new branch diverges.
    #[serde(
        default = "default_branch_point",
        deserialize_with = "lenient_branch_point"
    )]
    pub branch_point: String,
    /// Confidence weight of the new branch.
    #[serde(
        default = "default_probability",
        deserialize_with = "lenient_probability"
    )]
    pub probability: f64,
}

/// Parameters of `modify_world`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModifyWorld {
    /// Rule name → new description. Unknown rule names are ignored.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub modifications: Map<String, Value>,
}

/// Parameters of `rewrite_past`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RewritePast {
    /// Event on the active timeline to rewrite.
    pub event_id: String,
    /// Replacement content.
    pub new_content: String,
}

/// Parameters of `spawn_world`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnWorld {
    /// Genre of the nested world.
    pub genre: String,
    /// Constraints handed to world generation.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub constraints: Vec<String>,
    /// Conditions that would end the immersion.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub exit_conditions: Vec<String>,
}

/// Parameters of `break_fourth_wall`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BreakFourthWall {
    /// Which wall to break.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub wall_type: WallType,
}

/// The layer a fourth-wall break reaches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum WallType {
    /// The story/reality boundary.
    #[default]
    Narrative,
    /// The game mechanics.
    System,
    /// The meta-layer.
    Meta,
    /// Anything else; rejected.
    Other(String),
}

impl From<String> for WallType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "narrative" => Self::Narrative,
            "system" => Self::System,
            "meta" => Self::Meta,
            _ => Self::Other(value),
        }
    }
}

/// A meta-command resolved into its typed form.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaAction {
    /// Append a new active timeline.
    ForkTimeline(ForkTimeline),
    /// Overwrite existing physics rules.
    ModifyWorld(ModifyWorld),
    /// Rewrite an event on the active timeline.
    RewritePast(RewritePast),
    /// Generate and enter a nested world.
    SpawnWorld(SpawnWorld),
    /// Flavor-only fourth-wall break.
    BreakFourthWall(BreakFourthWall),
    /// Unrecognized command name.
    Unknown {
        /// The name as received.
        name: String,
    },
    /// Recognized name with malformed parameters.
    Invalid {
        /// The command name.
        name: String,
        /// Why the parameters were rejected.
        reason: String,
    },
}

/// Outcome of a meta-command. Unsuccessful results are expected, recoverable
/// outcomes rather than errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaCommandResult {
    /// Whether the command took effect.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Set when the command was held back for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_required: Option<bool>,
}

impl MetaCommandResult {
    /// A successful outcome.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            audit_required: None,
        }
    }

    /// A rejected outcome.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            audit_required: None,
        }
    }

    /// The command must be audited before it can run.
    #[must_use]
    pub fn audit_required() -> Self {
        Self {
            success: false,
            message: "Command requires system audit".to_owned(),
            audit_required: Some(true),
        }
    }

    /// Whether this result asks for an audit.
    #[must_use]
    pub fn needs_audit(&self) -> bool {
        self.audit_required == Some(true)
    }
}

/// Command to open a new session.
#[derive(Debug, Clone)]
pub struct InitializeSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning architect.
    pub architect_id: String,
    /// Participants; may include the architect.
    pub player_ids: Vec<String>,
}

impl Command for InitializeSession {
    fn command_type(&self) -> &'static str {
        "narrative.initialize_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to narrate a player's free-text input.
#[derive(Debug, Clone)]
pub struct ProcessPlayerInput {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: String,
    /// Acting player.
    pub actor_id: String,
    /// Raw input text.
    pub input: String,
    /// The character the player acts as.
    pub character: CharacterProfile,
}

impl Command for ProcessPlayerInput {
    fn command_type(&self) -> &'static str {
        "narrative.process_player_input"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to run a meta-command.
#[derive(Debug, Clone)]
pub struct ExecuteMetaCommand {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: String,
    /// Issuer.
    pub actor_id: String,
    /// The meta-command.
    pub command: MetaCommand,
}

impl Command for ExecuteMetaCommand {
    fn command_type(&self) -> &'static str {
        "narrative.execute_meta_command"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to put a meta-command up for architect review.
#[derive(Debug, Clone)]
pub struct RequestAudit {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: String,
    /// Who asked for the command.
    pub initiator_id: String,
    /// The command under review.
    pub command: MetaCommand,
    /// The player's case for the command.
    pub player_justification: String,
}

impl Command for RequestAudit {
    fn command_type(&self) -> &'static str {
        "narrative.request_audit"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to settle a pending audit.
#[derive(Debug, Clone)]
pub struct ResolveAudit {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: String,
    /// The audit to settle.
    pub audit_id: String,
    /// The architect's decision.
    pub resolution: AuditResolution,
    /// The architect's reasoning, if given.
    pub reasoning: Option<String>,
    /// Parameter overrides for a `modified` resolution.
    pub modifications: Option<Map<String, Value>>,
}

impl Command for ResolveAudit {
    fn command_type(&self) -> &'static str {
        "narrative.resolve_audit"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to have an NPC generated into a session.
#[derive(Debug, Clone)]
pub struct SpawnNpc {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: String,
    /// Seed backstory.
    pub backstory: String,
    /// Seed personality description.
    pub personality: String,
    /// Domain name → weight.
    pub domain_weights: Map<String, Value>,
    /// Where the NPC appears.
    pub location: String,
}

impl Command for SpawnNpc {
    fn command_type(&self) -> &'static str {
        "narrative.spawn_npc"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
