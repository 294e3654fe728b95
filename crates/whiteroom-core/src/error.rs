//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Expected, recoverable outcomes of meta-commands (unknown command name,
/// unknown wall type, missing event) are not errors; they are reported as
/// unsuccessful command results instead.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session is registered under the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// No audit is recorded under the given identifier.
    #[error("audit not found: {0}")]
    AuditNotFound(String),

    /// The content generator returned empty or unparseable output.
    #[error("content generation failed: {0}")]
    ContentGeneration(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backing store failed to read or write.
    #[error("persistence error: {0}")]
    Persistence(String),
}
