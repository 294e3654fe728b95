//! Query handlers for the narrative engine.
//!
//! Read-only views over the registry; nothing here mutates a session.

use std::collections::BTreeMap;

use serde::Serialize;
use whiteroom_core::clock::Clock;
use whiteroom_core::error::DomainError;

use crate::application::registry::SessionRegistry;
use crate::domain::aggregates::Session;
use crate::domain::audit::AuditResolution;
use crate::domain::events::EventType;

/// Audit bucket for unresolved audits.
pub const PENDING_AUDITS: &str = "pending";

/// Per-type event figures over the active timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTypeStats {
    /// How many events of this type were recorded.
    pub count: usize,
    /// Mean reality impact of those events.
    pub average_reality_impact: f64,
}

/// Read-only summary of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    /// The session identifier.
    pub session_id: String,
    /// Seconds since the session was opened.
    pub duration_secs: i64,
    /// Number of live timelines.
    pub active_timelines: usize,
    /// Current nesting depth.
    pub recursion_depth: usize,
    /// Entropy of the current world.
    pub entropy_level: u32,
    /// Number of listed players.
    pub player_count: usize,
    /// Event figures keyed by event type.
    pub event_statistics: BTreeMap<EventType, EventTypeStats>,
    /// Audit counts keyed by resolution, with `pending` for open audits.
    pub audit_statistics: BTreeMap<String, usize>,
}

/// Retrieves a session. Absence is not an error.
///
/// # Errors
///
/// Returns `DomainError::Persistence` on store failure.
pub async fn get_session(
    session_id: &str,
    registry: &SessionRegistry,
) -> Result<Option<Session>, DomainError> {
    registry.get(session_id).await
}

/// Summarizes a session's timelines, events and audits.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist or
/// `DomainError::Persistence` on store failure.
#[allow(clippy::cast_precision_loss)]
pub async fn session_stats(
    session_id: &str,
    clock: &dyn Clock,
    registry: &SessionRegistry,
) -> Result<SessionStats, DomainError> {
    let session = registry.require(session_id).await?;
    let audits = registry.load_audits(session_id).await?;
    let state = &session.narrative_state;

    let mut totals: BTreeMap<EventType, (usize, f64)> = BTreeMap::new();
    for event in state.active_timeline().map(|t| t.events.as_slice()).unwrap_or_default() {
        let entry = totals.entry(event.kind).or_default();
        entry.0 += 1;
        entry.1 += event.reality_impact;
    }
    let event_statistics = totals
        .into_iter()
        .map(|(kind, (count, impact))| {
            let stats = EventTypeStats {
                count,
                average_reality_impact: impact / count as f64,
            };
            (kind, stats)
        })
        .collect();

    let mut audit_statistics: BTreeMap<String, usize> = BTreeMap::new();
    for audit in &audits {
        let bucket = audit
            .resolution
            .map_or(PENDING_AUDITS, AuditResolution::as_str);
        *audit_statistics.entry(bucket.to_owned()).or_default() += 1;
    }

    Ok(SessionStats {
        session_id: session.id.clone(),
        duration_secs: clock.elapsed_since(session.created_at).num_seconds(),
        active_timelines: state.active_timelines.iter().filter(|t| t.is_active).count(),
        recursion_depth: state.recursion_depth(),
        entropy_level: session.current_world.entropy_level,
        player_count: session.player_ids.len(),
        event_statistics,
        audit_statistics,
    })
}

/// The most recent `limit` narrative history entries, oldest first.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist or
/// `DomainError::Persistence` on store failure.
pub async fn narrative_history(
    session_id: &str,
    limit: usize,
    registry: &SessionRegistry,
) -> Result<Vec<String>, DomainError> {
    registry.require(session_id).await?;
    registry.recent_history(session_id, limit).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use serde_json::Map;
    use uuid::Uuid;
    use whiteroom_core::error::DomainError;
    use whiteroom_test_support::{FixedClock, RecordingKeyValueStore, SequenceIdGenerator};

    use crate::application::audit_handlers::{handle_request_audit, handle_resolve_audit};
    use crate::application::command_handlers::{
        handle_initialize_session, handle_process_player_input,
    };
    use crate::application::query_handlers::{get_session, narrative_history, session_stats};
    use crate::application::registry::{DEFAULT_TTL, SessionRegistry};
    use crate::application::test_doubles::StubGenerator;
    use crate::domain::audit::AuditResolution;
    use crate::domain::commands::{
        InitializeSession, MetaCommand, ProcessPlayerInput, RequestAudit, ResolveAudit,
    };
    use crate::domain::events::EventType;
    use crate::domain::generation::CharacterProfile;

    fn registry(clock: FixedClock) -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(RecordingKeyValueStore::new()),
            Arc::new(clock),
            DEFAULT_TTL,
        )
    }

    #[tokio::test]
    async fn test_get_session_for_unknown_id_returns_none() {
        // Arrange
        let registry = registry(FixedClock::standard());

        // Act
        let result = get_session("session_never_created", &registry).await;

        // Assert
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_stats_summarizes_events_and_audits() {
        // Arrange
        let clock = FixedClock::standard();
        let ids = SequenceIdGenerator::new();
        let registry = registry(clock);
        let generator = StubGenerator::new();
        let session = handle_initialize_session(
            &InitializeSession {
                correlation_id: Uuid::new_v4(),
                architect_id: "architect".to_owned(),
                player_ids: vec!["player-1".to_owned(), "player-2".to_owned()],
            },
            &clock,
            &ids,
            &registry,
        )
        .await
        .unwrap();

        for input in ["I walk", "I look at the world", "\"Hello\""] {
            let command = ProcessPlayerInput {
                correlation_id: Uuid::new_v4(),
                session_id: session.id.clone(),
                actor_id: "player-1".to_owned(),
                input: input.to_owned(),
                character: CharacterProfile::default(),
            };
            handle_process_player_input(&command, &clock, &ids, &registry, &generator)
                .await
                .unwrap();
        }

        let request = || RequestAudit {
            correlation_id: Uuid::new_v4(),
            session_id: session.id.clone(),
            initiator_id: "player-1".to_owned(),
            command: MetaCommand {
                requires_audit: true,
                ..MetaCommand::new("fork_timeline", Map::new())
            },
            player_justification: "Branching out".to_owned(),
        };
        let denied = handle_request_audit(&request(), &clock, &ids, &registry, &generator)
            .await
            .unwrap();
        handle_request_audit(&request(), &clock, &ids, &registry, &generator)
            .await
            .unwrap();
        handle_resolve_audit(
            &ResolveAudit {
                correlation_id: Uuid::new_v4(),
                session_id: session.id.clone(),
                audit_id: denied.id,
                resolution: AuditResolution::Denied,
                reasoning: None,
                modifications: None,
            },
            &clock,
            &ids,
            &registry,
            &generator,
        )
        .await
        .unwrap();

        let later = FixedClock(clock.0 + TimeDelta::seconds(90));

        // Act
        let stats = session_stats(&session.id, &later, &registry).await.unwrap();

        // Assert
        assert_eq!(stats.session_id, session.id);
        assert_eq!(stats.duration_secs, 90);
        assert_eq!(stats.active_timelines, 1);
        assert_eq!(stats.recursion_depth, 0);
        assert_eq!(stats.player_count, 2);

        let actions = &stats.event_statistics[&EventType::Action];
        assert_eq!(actions.count, 2);
        assert!((actions.average_reality_impact - 0.25).abs() < 1e-12);
        assert_eq!(stats.event_statistics[&EventType::Dialogue].count, 1);

        assert_eq!(stats.audit_statistics["denied"], 1);
        assert_eq!(stats.audit_statistics["pending"], 1);
    }

    #[tokio::test]
    async fn test_narrative_history_respects_limit() {
        // Arrange
        let clock = FixedClock::standard();
        let ids = SequenceIdGenerator::new();
        let registry = registry(clock);
        let session = handle_initialize_session(
            &InitializeSession {
                correlation_id: Uuid::new_v4(),
                architect_id: "architect".to_owned(),
                player_ids: Vec::new(),
            },
            &clock,
            &ids,
            &registry,
        )
        .await
        .unwrap();
        for n in 0..3 {
            registry
                .append_history(&session.id, format!("action: step {n}"))
                .await
                .unwrap();
        }

        // Act
        let history = narrative_history(&session.id, 2, &registry).await.unwrap();

        // Assert
        assert_eq!(history, vec!["action: step 1", "action: step 2"]);
    }

    #[tokio::test]
    async fn test_narrative_history_unknown_session() {
        // Arrange
        let registry = registry(FixedClock::standard());

        // Act
        let result = narrative_history("session_missing", 10, &registry).await;

        // Assert
        assert!(matches!(result, Err(DomainError::SessionNotFound(_))));
    }
}
