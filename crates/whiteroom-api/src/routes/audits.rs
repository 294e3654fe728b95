//! Routes for the system audit workflow.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};
use uuid::Uuid;
use whiteroom_narrative::application::audit_handlers::{self, AuditOutcome};
use whiteroom_narrative::domain::audit::{AuditResolution, SystemAudit};
use whiteroom_narrative::domain::commands::{MetaCommand, RequestAudit, ResolveAudit};

use crate::error::ApiError;
use crate::gateway::channels::{session_topic, user_topic};
use crate::gateway::handlers::NOT_THE_ARCHITECT;
use crate::gateway::messages::ServerMessage;
use crate::identity::Actor;
use crate::state::AppState;

/// Request body for POST /{session_id}/audits.
#[derive(Debug, Deserialize)]
pub struct RequestAuditRequest {
    /// Who asks for the command.
    pub initiator_id: String,
    /// The command under review.
    pub command: MetaCommand,
    /// The player's case for the command.
    #[serde(default)]
    pub player_justification: String,
}

/// Request body for PUT /{session_id}/audits/{audit_id}.
#[derive(Debug, Deserialize)]
pub struct ResolveAuditRequest {
    /// `approved`, `denied` or `modified`.
    pub resolution: AuditResolution,
    /// The architect's reasoning.
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Parameter overrides for a `modified` resolution.
    #[serde(default)]
    pub modifications: Option<Map<String, Value>>,
}

/// GET /{session_id}/audits
async fn list_audits(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<SystemAudit>>, ApiError> {
    let audits = audit_handlers::list_audits(&session_id, &state.registry).await?;
    Ok(Json(audits))
}

/// POST /{session_id}/audits
///
/// The initiator comes from `initiator_id` in the body. When identity
/// headers are present they must name the same user.
#[instrument(skip(state, actor, request), fields(initiator_id = %request.initiator_id))]
async fn request_audit(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(session_id): Path<String>,
    Json(request): Json<RequestAuditRequest>,
) -> Result<(StatusCode, Json<SystemAudit>), ApiError> {
    if let Some(actor) = &actor {
        actor.vouch_for("initiator_id", &request.initiator_id)?;
    }
    let _guard = state.locks.lock(&session_id).await;

    let command = RequestAudit {
        correlation_id: Uuid::new_v4(),
        session_id,
        initiator_id: request.initiator_id,
        command: request.command,
        player_justification: request.player_justification,
    };

    info!(correlation_id = %command.correlation_id, "handling request_audit command");

    let audit = audit_handlers::handle_request_audit(
        &command,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
        state.generator.as_ref(),
    )
    .await?;

    let session = state.registry.require(&command.session_id).await?;
    state.hub.publish(
        &user_topic(&session.architect_id),
        ServerMessage::AuditRequest {
            session_id: session.id,
            audit: audit.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(audit)))
}

/// PUT /{session_id}/audits/{audit_id}
#[instrument(skip(state, actor, request), fields(actor_id = %actor.user_id, resolution = %request.resolution))]
async fn resolve_audit(
    State(state): State<AppState>,
    actor: Actor,
    Path((session_id, audit_id)): Path<(String, String)>,
    Json(request): Json<ResolveAuditRequest>,
) -> Result<Json<AuditOutcome>, ApiError> {
    let _guard = state.locks.lock(&session_id).await;

    let session = state.registry.require(&session_id).await?;
    if !actor.is_architect_of(&session) {
        return Err(ApiError::Forbidden(NOT_THE_ARCHITECT.to_owned()));
    }

    let command = ResolveAudit {
        correlation_id: Uuid::new_v4(),
        session_id,
        audit_id,
        resolution: request.resolution,
        reasoning: request.reasoning,
        modifications: request.modifications,
    };

    info!(correlation_id = %command.correlation_id, "handling resolve_audit command");

    let outcome = audit_handlers::handle_resolve_audit(
        &command,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
        state.generator.as_ref(),
    )
    .await?;

    state.hub.publish(
        &session_topic(&command.session_id),
        ServerMessage::AuditResolved {
            session_id: command.session_id.clone(),
            audit: outcome.audit.clone(),
            execution: outcome.execution.clone(),
        },
    );

    Ok(Json(outcome))
}

/// Returns the router for audit routes, nested under the sessions prefix.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{session_id}/audits",
            get(list_audits).post(request_audit),
        )
        .route("/{session_id}/audits/{audit_id}", put(resolve_audit))
}
