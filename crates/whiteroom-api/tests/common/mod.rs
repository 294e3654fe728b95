//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use tower::ServiceExt;
use whiteroom_core::error::DomainError;
use whiteroom_core::store::KeyValueStore;
use whiteroom_narrative::application::registry::{DEFAULT_TTL, SessionRegistry};
use whiteroom_narrative::domain::commands::MetaCommand;
use whiteroom_narrative::domain::effects::SystemEffect;
use whiteroom_narrative::domain::generation::{
    AuditAssessment, CharacterProfile, ContentGenerator, GeneratedWorld, NarrativeResponse,
};
use whiteroom_test_support::{
    FailingKeyValueStore, FixedClock, RecordingKeyValueStore, SequenceIdGenerator,
};

use whiteroom_api::build_router;
use whiteroom_api::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
use whiteroom_api::state::AppState;

/// Generator with canned replies. Narration and audit advice can be made
/// to fail; world and character generation always succeed.
pub struct ScriptedGenerator {
    pub narrative: Option<NarrativeResponse>,
    pub assessment: Option<AuditAssessment>,
    pub character_requests: Mutex<Vec<(String, String)>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self {
            narrative: Some(NarrativeResponse {
                content: "The white walls ripple.".to_owned(),
                reasoning: "Atmospheric".to_owned(),
                system_effects: Vec::new(),
                narrative_coherence: 80.0,
            }),
            assessment: Some(AuditAssessment {
                approved: true,
                reasoning: "Fits the established rules".to_owned(),
                modifications: None,
            }),
            character_requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedGenerator {
    pub fn with_effects(effects: Vec<SystemEffect>) -> Self {
        let mut generator = Self::default();
        if let Some(narrative) = generator.narrative.as_mut() {
            narrative.system_effects = effects;
        }
        generator
    }

    pub fn unavailable() -> Self {
        Self {
            narrative: None,
            assessment: None,
            ..Self::default()
        }
    }
}

fn generation_failed() -> DomainError {
    DomainError::ContentGeneration("narrative: no content returned".to_owned())
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn narrate(
        &self,
        _input: &str,
        _character: &CharacterProfile,
        _world_context: &str,
        _history: &[String],
    ) -> Result<NarrativeResponse, DomainError> {
        self.narrative.clone().ok_or_else(generation_failed)
    }

    async fn generate_world(
        &self,
        genre: &str,
        _parent_world: Option<&str>,
        _constraints: &[String],
    ) -> Result<GeneratedWorld, DomainError> {
        Ok(GeneratedWorld {
            name: "Paper Lantern City".to_owned(),
            genre: genre.to_owned(),
            physics_rules: [("magic".to_owned(), json!("Ink becomes real"))].into(),
            narrative_constraints: vec!["Every light casts a story".to_owned()],
            entropy_level: 1,
        })
    }

    async fn generate_character(
        &self,
        backstory: &str,
        personality: &str,
        _domain_weights: &Map<String, Value>,
    ) -> Result<CharacterProfile, DomainError> {
        self.character_requests
            .lock()
            .unwrap()
            .push((backstory.to_owned(), personality.to_owned()));
        Ok(CharacterProfile {
            id: None,
            name: "The Archivist".to_owned(),
            attributes: [("backstory".to_owned(), json!(backstory))].into_iter().collect(),
        })
    }

    async fn assess_audit(
        &self,
        _command: &MetaCommand,
        _player_justification: &str,
        _world_context: &str,
    ) -> Result<AuditAssessment, DomainError> {
        self.assessment.clone().ok_or_else(generation_failed)
    }
}

/// State over an in-memory recording store, a fixed clock and sequential ids.
pub fn test_state() -> AppState {
    test_state_with(ScriptedGenerator::default())
}

/// Like [`test_state`] with a custom generator.
pub fn test_state_with(generator: ScriptedGenerator) -> AppState {
    state_over(Arc::new(RecordingKeyValueStore::new()), Arc::new(generator))
}

/// Like [`test_state_with`], keeping a handle on the generator so tests
/// can inspect what it was asked.
pub fn test_state_observing(generator: Arc<ScriptedGenerator>) -> AppState {
    state_over(Arc::new(RecordingKeyValueStore::new()), generator)
}

/// State whose store rejects every call.
pub fn failing_store_state() -> AppState {
    state_over(
        Arc::new(FailingKeyValueStore),
        Arc::new(ScriptedGenerator::default()),
    )
}

fn state_over(store: Arc<dyn KeyValueStore>, generator: Arc<dyn ContentGenerator>) -> AppState {
    let clock = Arc::new(FixedClock::standard());
    let registry = Arc::new(SessionRegistry::new(store, clock.clone(), DEFAULT_TTL));
    AppState::new(
        clock,
        Arc::new(SequenceIdGenerator::new()),
        registry,
        generator,
    )
}

/// Build the full app router over `state`. Uses the same route structure as
/// `main.rs`, without middleware.
pub fn build_test_app(state: AppState) -> Router {
    build_router(state)
}

/// Identity headers for a player.
pub fn player(user_id: &'static str) -> Vec<(&'static str, &'static str)> {
    vec![(USER_ID_HEADER, user_id), (USER_ROLE_HEADER, "player")]
}

/// Identity headers for an architect.
pub fn architect(user_id: &'static str) -> Vec<(&'static str, &'static str)> {
    vec![(USER_ID_HEADER, user_id), (USER_ROLE_HEADER, "architect")]
}

/// Send a request and return the status and JSON body (`null` when empty).
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    send(app, "POST", uri, &[], Some(body)).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, &[], None).await
}

/// Send a PUT request with identity headers and a JSON body.
pub async fn put_json(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: &Value,
) -> (StatusCode, Value) {
    send(app, "PUT", uri, headers, Some(body)).await
}

/// Opens a session owned by `architect_id` over REST and returns its id.
pub async fn create_session(state: &AppState, architect_id: &str, player_ids: &[&str]) -> String {
    let (status, json) = post_json(
        build_test_app(state.clone()),
        "/api/v1/sessions",
        &json!({ "architect_id": architect_id, "player_ids": player_ids }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_owned()
}
