//! Decoding of model replies.

use serde::de::DeserializeOwned;
use whiteroom_core::error::DomainError;
use whiteroom_narrative::domain::generation::NarrativeResponse;

/// Lowest coherence score a narrative reply may carry.
pub const MIN_COHERENCE: f64 = 0.0;

/// Highest coherence score a narrative reply may carry.
pub const MAX_COHERENCE: f64 = 100.0;

/// Strips a surrounding Markdown code fence, with or without a language tag.
#[must_use]
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decodes a JSON reply into `T`.
///
/// # Errors
///
/// Returns `DomainError::ContentGeneration` if the reply is empty or does
/// not decode.
pub fn decode<T: DeserializeOwned>(task: &str, content: &str) -> Result<T, DomainError> {
    let json = extract_json(content);
    if json.is_empty() {
        return Err(DomainError::ContentGeneration(format!("{task}: empty reply")));
    }
    serde_json::from_str(json)
        .map_err(|e| DomainError::ContentGeneration(format!("{task}: unparseable reply: {e}")))
}

/// Decodes a narrative reply and clamps its coherence into range.
///
/// # Errors
///
/// Returns `DomainError::ContentGeneration` if the reply is empty or does
/// not decode.
pub fn decode_narrative(content: &str) -> Result<NarrativeResponse, DomainError> {
    let mut response: NarrativeResponse = decode("narrative", content)?;
    response.narrative_coherence = response
        .narrative_coherence
        .clamp(MIN_COHERENCE, MAX_COHERENCE);
    Ok(response)
}
