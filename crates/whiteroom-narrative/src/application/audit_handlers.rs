//! Audit workflow handlers: opening, resolving and listing system audits.

use serde::Serialize;
use tracing::{info, warn};
use whiteroom_core::clock::Clock;
use whiteroom_core::command::Command as _;
use whiteroom_core::error::DomainError;
use whiteroom_core::id::IdGenerator;

use crate::application::command_handlers::execute_unaudited;
use crate::application::registry::SessionRegistry;
use crate::domain::audit::SystemAudit;
use crate::domain::commands::{MetaCommandResult, RequestAudit, ResolveAudit};
use crate::domain::generation::ContentGenerator;

/// A resolved audit and what running its command produced.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    /// The audit after resolution.
    pub audit: SystemAudit,
    /// Result of the executed command; `None` when denied.
    pub execution: Option<MetaCommandResult>,
}

/// Handles the `RequestAudit` command: records a pending audit with the
/// generator's advisory assessment attached.
///
/// The assessment is best effort; if it fails the audit is still opened.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist or
/// `DomainError::Persistence` if the ledger cannot be written.
pub async fn handle_request_audit(
    command: &RequestAudit,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    registry: &SessionRegistry,
    generator: &dyn ContentGenerator,
) -> Result<SystemAudit, DomainError> {
    let session = registry.require(&command.session_id).await?;

    let ai_justification = match generator
        .assess_audit(
            &command.command,
            &command.player_justification,
            &session.world_context(),
        )
        .await
    {
        Ok(assessment) => Some(assessment.reasoning),
        Err(e) => {
            warn!(session_id = %session.id, error = %e, "audit assessment unavailable");
            None
        }
    };

    let audit = SystemAudit {
        id: ids.next_id("audit"),
        session_id: session.id.clone(),
        initiator_id: command.initiator_id.clone(),
        command: command.command.clone(),
        player_justification: command.player_justification.clone(),
        ai_justification,
        resolution: None,
        modifications: None,
        created_at: clock.now(),
        resolved_at: None,
    };

    let mut audits = registry.load_audits(&session.id).await?;
    audits.push(audit.clone());
    registry.save_audits(&session.id, &audits).await?;

    info!(
        session_id = %session.id,
        audit_id = %audit.id,
        initiator_id = %audit.initiator_id,
        command = %audit.command.command,
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "audit requested"
    );
    Ok(audit)
}

/// Handles the `ResolveAudit` command: records the architect's decision and
/// runs the audited command when approved or modified.
///
/// The resolution is written to the ledger before the command runs, so a
/// ledger failure never leaves an executed command behind a pending audit.
/// If the command itself fails, the audit is put back to pending.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, `DomainError::AuditNotFound`,
/// `DomainError::Validation` if the audit is already resolved, or whatever
/// executing the command returns.
pub async fn handle_resolve_audit(
    command: &ResolveAudit,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    registry: &SessionRegistry,
    generator: &dyn ContentGenerator,
) -> Result<AuditOutcome, DomainError> {
    let mut session = registry.require(&command.session_id).await?;
    let mut audits = registry.load_audits(&session.id).await?;
    let index = audits
        .iter()
        .position(|a| a.id == command.audit_id)
        .ok_or_else(|| DomainError::AuditNotFound(command.audit_id.clone()))?;

    let pending = audits[index].clone();
    let mut audit = pending.clone();
    audit
        .resolve(
            command.resolution,
            command.reasoning.clone(),
            command.modifications.clone(),
            clock.now(),
        )
        .map_err(|_| DomainError::Validation("audit already resolved".to_owned()))?;

    audits[index] = audit.clone();
    registry.save_audits(&session.id, &audits).await?;

    let execution = match audit.command_to_execute() {
        Some(approved) => {
            match execute_unaudited(&mut session, &approved, clock, ids, registry, generator).await
            {
                Ok(result) => Some(result),
                Err(e) => {
                    audits[index] = pending;
                    if let Err(reopen) = registry.save_audits(&session.id, &audits).await {
                        warn!(
                            session_id = %session.id,
                            audit_id = %audit.id,
                            error = %reopen,
                            "audit stays resolved after failed execution"
                        );
                    }
                    return Err(e);
                }
            }
        }
        None => None,
    };

    info!(
        session_id = %session.id,
        audit_id = %audit.id,
        resolution = %command.resolution,
        executed = execution.is_some(),
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "audit resolved"
    );
    Ok(AuditOutcome { audit, execution })
}

/// Lists a session's audits, newest first.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist or
/// `DomainError::Persistence` on store failure.
pub async fn list_audits(
    session_id: &str,
    registry: &SessionRegistry,
) -> Result<Vec<SystemAudit>, DomainError> {
    registry.require(session_id).await?;
    let mut audits = registry.load_audits(session_id).await?;
    audits.reverse();
    Ok(audits)
}
