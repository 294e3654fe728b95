//! Chat-completions client implementing `ContentGenerator`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use whiteroom_core::error::DomainError;
use whiteroom_narrative::domain::commands::MetaCommand;
use whiteroom_narrative::domain::generation::{
    AuditAssessment, CharacterProfile, ContentGenerator, GeneratedWorld, NarrativeResponse,
};

use crate::prompts::{self, Task};
use crate::reply;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// API root used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound on one completion round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the chat-completions API.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiConfig {
    /// Settings with the default model and endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// The chat-completions URL for this API root.
    #[must_use]
    pub fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let base = base.strip_suffix("/chat/completions").unwrap_or(base);
        format!("{base}/chat/completions")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `ContentGenerator` backed by an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiContentGenerator {
    client: reqwest::Client,
    config: OpenAiConfig,
    url: String,
}

impl OpenAiContentGenerator {
    /// Builds a generator with a pooled HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let url = config.chat_completions_url();
        Ok(Self {
            client,
            config,
            url,
        })
    }

    async fn complete(&self, task: Task, user_prompt: &str) -> Result<String, DomainError> {
        let failure =
            |detail: String| DomainError::ContentGeneration(format!("{}: {detail}", task.name()));

        let payload = ChatCompletionRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: task.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: task.temperature(),
            max_tokens: task.max_tokens(),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| failure(format!("request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(task = task.name(), status = status.as_u16(), "completion rejected");
            return Err(failure(format!("http {}: {body}", status.as_u16())));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("undecodable response: {e}")))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| failure("no content returned".to_owned()))?;

        debug!(task = task.name(), chars = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl ContentGenerator for OpenAiContentGenerator {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn narrate(
        &self,
        input: &str,
        character: &CharacterProfile,
        world_context: &str,
        history: &[String],
    ) -> Result<NarrativeResponse, DomainError> {
        let prompt = prompts::narrative(input, character, world_context, history);
        let content = self.complete(Task::Narrative, &prompt).await?;
        reply::decode_narrative(&content)
    }

    #[instrument(skip_all, fields(model = %self.config.model, genre = %genre))]
    async fn generate_world(
        &self,
        genre: &str,
        parent_world: Option<&str>,
        constraints: &[String],
    ) -> Result<GeneratedWorld, DomainError> {
        let prompt = prompts::world(genre, parent_world, constraints);
        let content = self.complete(Task::World, &prompt).await?;
        reply::decode(Task::World.name(), &content)
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate_character(
        &self,
        backstory: &str,
        personality: &str,
        domain_weights: &Map<String, Value>,
    ) -> Result<CharacterProfile, DomainError> {
        let prompt = prompts::character(backstory, personality, domain_weights);
        let content = self.complete(Task::Character, &prompt).await?;
        reply::decode(Task::Character.name(), &content)
    }

    #[instrument(skip_all, fields(model = %self.config.model, command = %command.command))]
    async fn assess_audit(
        &self,
        command: &MetaCommand,
        player_justification: &str,
        world_context: &str,
    ) -> Result<AuditAssessment, DomainError> {
        let prompt = prompts::audit(command, player_justification, world_context);
        let content = self.complete(Task::Audit, &prompt).await?;
        reply::decode(Task::Audit.name(), &content)
    }
}
