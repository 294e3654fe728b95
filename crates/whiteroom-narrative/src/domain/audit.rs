//! System audits: architect review of high-impact meta-commands.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::commands::MetaCommand;

/// Terminal decision on an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResolution {
    /// Run the command as requested.
    Approved,
    /// Do not run the command.
    Denied,
    /// Run the command with the architect's parameter overrides.
    Modified,
}

impl AuditResolution {
    /// The lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for AuditResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known resolution.
#[derive(Debug, Error)]
#[error("unknown audit resolution: {0}")]
pub struct UnknownResolution(pub String);

impl FromStr for AuditResolution {
    type Err = UnknownResolution;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            "modified" => Ok(Self::Modified),
            other => Err(UnknownResolution(other.to_owned())),
        }
    }
}

/// A pending or resolved governance decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAudit {
    /// Audit identifier.
    pub id: String,
    /// Session the command targets.
    pub session_id: String,
    /// Who asked for the command.
    pub initiator_id: String,
    /// The command under review.
    pub command: MetaCommand,
    /// The player's case for the command.
    pub player_justification: String,
    /// Advisory or architect reasoning.
    pub ai_justification: Option<String>,
    /// `None` while pending.
    pub resolution: Option<AuditResolution>,
    /// Parameter overrides recorded with a resolution.
    pub modifications: Option<Map<String, Value>>,
    /// When the audit was opened.
    pub created_at: DateTime<Utc>,
    /// When the audit was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SystemAudit {
    /// Whether a decision has been recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Records the architect's decision.
    ///
    /// # Errors
    ///
    /// Returns the existing resolution if the audit was already resolved;
    /// audits resolve exactly once.
    pub fn resolve(
        &mut self,
        resolution: AuditResolution,
        reasoning: Option<String>,
        modifications: Option<Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> Result<(), AuditResolution> {
        if let Some(existing) = self.resolution {
            return Err(existing);
        }
        self.resolution = Some(resolution);
        if reasoning.is_some() {
            self.ai_justification = reasoning;
        }
        self.modifications = modifications;
        self.resolved_at = Some(now);
        Ok(())
    }

    /// The command to run for this audit's resolution, if any.
    #[must_use]
    pub fn command_to_execute(&self) -> Option<MetaCommand> {
        let command = match self.resolution? {
            AuditResolution::Denied => return None,
            AuditResolution::Approved => self.command.clone(),
            AuditResolution::Modified => match &self.modifications {
                Some(overrides) => self.command.with_overrides(overrides),
                None => self.command.clone(),
            },
        };
        Some(MetaCommand {
            requires_audit: false,
            ..command
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn pending_audit() -> SystemAudit {
        SystemAudit {
            id: "audit_1".to_owned(),
            session_id: "session_1".to_owned(),
            initiator_id: "player-1".to_owned(),
            command: serde_json::from_value(json!({
                "command": "spawn_world",
                "parameters": { "genre": "fantasy" },
                "requires_audit": true,
                "system_access_level": 9
            }))
            .unwrap(),
            player_justification: "My character dreams of dragons".to_owned(),
            ai_justification: None,
            resolution: None,
            modifications: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_resolve_is_exactly_once() {
        let mut audit = pending_audit();
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();

        audit
            .resolve(AuditResolution::Denied, Some("Too soon".to_owned()), None, now)
            .unwrap();
        let second = audit.resolve(AuditResolution::Approved, None, None, now);

        assert_eq!(second, Err(AuditResolution::Denied));
        assert_eq!(audit.resolution, Some(AuditResolution::Denied));
        assert_eq!(audit.ai_justification.as_deref(), Some("Too soon"));
        assert_eq!(audit.resolved_at, Some(now));
    }

    #[test]
    fn test_denied_audit_executes_nothing() {
        let mut audit = pending_audit();
        audit
            .resolve(AuditResolution::Denied, None, None, Utc::now())
            .unwrap();

        assert!(audit.command_to_execute().is_none());
    }

    #[test]
    fn test_modified_audit_overlays_parameters_and_lifts_gate() {
        let mut audit = pending_audit();
        let overrides = json!({ "genre": "noir" }).as_object().unwrap().clone();
        audit
            .resolve(AuditResolution::Modified, None, Some(overrides), Utc::now())
            .unwrap();

        let command = audit.command_to_execute().unwrap();

        assert!(!command.requires_audit);
        assert_eq!(command.parameters["genre"], "noir");
    }

    #[test]
    fn test_resolution_parses_from_str() {
        assert_eq!("approved".parse::<AuditResolution>().unwrap(), AuditResolution::Approved);
        assert!("maybe".parse::<AuditResolution>().is_err());
    }
}
