//! Routes for opening and inspecting sessions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use whiteroom_core::error::DomainError;
use whiteroom_narrative::application::registry::{DEFAULT_HISTORY_WINDOW, HISTORY_CAP};
use whiteroom_narrative::application::{command_handlers, query_handlers};
use whiteroom_narrative::domain::aggregates::Session;
use whiteroom_narrative::domain::commands::InitializeSession;

use crate::error::ApiError;
use crate::gateway::handlers::NOT_THE_ARCHITECT;
use crate::identity::{Actor, Role};
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// The owning architect.
    pub architect_id: String,
    /// Initial participants.
    #[serde(default)]
    pub player_ids: Vec<String>,
}

/// Query string for GET /{session_id}/history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// How many of the most recent entries to return.
    pub limit: Option<usize>,
}

/// Response body for GET /{session_id}/history.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// The session.
    pub session_id: String,
    /// `"{type}: {content}"` entries, oldest first.
    pub entries: Vec<String>,
}

/// POST /
///
/// The owner comes from `architect_id` in the body. When identity headers
/// are present the caller must be that architect.
#[instrument(skip(state, actor, request), fields(architect_id = %request.architect_id))]
async fn create_session(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    if request.architect_id.trim().is_empty() {
        return Err(DomainError::Validation("architect_id must not be empty".to_owned()).into());
    }
    if let Some(actor) = &actor {
        if actor.role != Role::Architect {
            return Err(ApiError::Forbidden(NOT_THE_ARCHITECT.to_owned()));
        }
        actor.vouch_for("architect_id", &request.architect_id)?;
    }

    let command = InitializeSession {
        correlation_id: Uuid::new_v4(),
        architect_id: request.architect_id,
        player_ids: request.player_ids,
    };

    info!(correlation_id = %command.correlation_id, "handling initialize_session command");

    let session = command_handlers::handle_initialize_session(
        &command,
        state.clock.as_ref(),
        state.ids.as_ref(),
        &state.registry,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /{session_id}
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    query_handlers::get_session(&session_id, &state.registry)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::SessionNotFound(session_id).into())
}

/// GET /{session_id}/stats
async fn get_session_stats(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<query_handlers::SessionStats>, ApiError> {
    let stats =
        query_handlers::session_stats(&session_id, state.clock.as_ref(), &state.registry).await?;
    Ok(Json(stats))
}

/// GET /{session_id}/history
async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_WINDOW)
        .min(HISTORY_CAP);
    let entries = query_handlers::narrative_history(&session_id, limit, &state.registry).await?;
    Ok(Json(HistoryResponse {
        session_id,
        entries,
    }))
}

/// Returns the router for session routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{session_id}", get(get_session))
        .route("/{session_id}/stats", get(get_session_stats))
        .route("/{session_id}/history", get(get_history))
}
