//! Scripted `ContentGenerator` for application-layer tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use whiteroom_core::error::DomainError;

use crate::domain::commands::MetaCommand;
use crate::domain::effects::SystemEffect;
use crate::domain::generation::{
    AuditAssessment, CharacterProfile, ContentGenerator, GeneratedWorld, NarrativeResponse,
};

/// Returns canned results and records what it was asked.
pub(crate) struct StubGenerator {
    pub narrative: Option<NarrativeResponse>,
    pub world: Option<GeneratedWorld>,
    pub assessment: Option<AuditAssessment>,
    pub histories: Mutex<Vec<Vec<String>>>,
    pub world_requests: Mutex<Vec<(String, Option<String>, Vec<String>)>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            narrative: Some(NarrativeResponse {
                content: "The room hums.".to_owned(),
                reasoning: "Quiet start".to_owned(),
                system_effects: Vec::new(),
                narrative_coherence: 85.0,
            }),
            world: Some(GeneratedWorld {
                name: "Neon Hollow".to_owned(),
                genre: "cyberpunk".to_owned(),
                physics_rules: [("gravity".to_owned(), json!("Standard"))].into(),
                narrative_constraints: vec!["Technology is sentient".to_owned()],
                entropy_level: 0,
            }),
            assessment: Some(AuditAssessment {
                approved: true,
                reasoning: "Consistent with the story so far".to_owned(),
                modifications: None,
            }),
            histories: Mutex::new(Vec::new()),
            world_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_effects(effects: Vec<SystemEffect>, coherence: f64) -> Self {
        let mut stub = Self::new();
        if let Some(narrative) = stub.narrative.as_mut() {
            narrative.system_effects = effects;
            narrative.narrative_coherence = coherence;
        }
        stub
    }

    pub fn failing() -> Self {
        Self {
            narrative: None,
            world: None,
            assessment: None,
            ..Self::new()
        }
    }
}

fn unavailable() -> DomainError {
    DomainError::ContentGeneration("generator returned no content".to_owned())
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn narrate(
        &self,
        _input: &str,
        _character: &CharacterProfile,
        _world_context: &str,
        history: &[String],
    ) -> Result<NarrativeResponse, DomainError> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.narrative.clone().ok_or_else(unavailable)
    }

    async fn generate_world(
        &self,
        genre: &str,
        parent_world: Option<&str>,
        constraints: &[String],
    ) -> Result<GeneratedWorld, DomainError> {
        self.world_requests.lock().unwrap().push((
            genre.to_owned(),
            parent_world.map(str::to_owned),
            constraints.to_vec(),
        ));
        self.world.clone().ok_or_else(unavailable)
    }

    async fn generate_character(
        &self,
        backstory: &str,
        personality: &str,
        _domain_weights: &Map<String, Value>,
    ) -> Result<CharacterProfile, DomainError> {
        let mut attributes = Map::new();
        attributes.insert("backstory".to_owned(), json!(backstory));
        attributes.insert("personality".to_owned(), json!(personality));
        Ok(CharacterProfile {
            id: None,
            name: "Mara the Cartographer".to_owned(),
            attributes,
        })
    }

    async fn assess_audit(
        &self,
        _command: &MetaCommand,
        _player_justification: &str,
        _world_context: &str,
    ) -> Result<AuditAssessment, DomainError> {
        self.assessment.clone().ok_or_else(unavailable)
    }
}
