use thiserror::Error;

use topicforge_ai::AiError;
use topicforge_core::DomainError;
use topicforge_recommendations::FetchError;

/// Failure surfaced to the UI boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Both recommendation tiers failed. Retryable.
    #[error("recommendations unavailable: {0}")]
    Recommendations(#[from] FetchError),

    /// The conversation rejected the request (e.g. confirming outside `Ready`).
    #[error(transparent)]
    Conversation(#[from] DomainError),

    #[error("subject generation failed: {0}")]
    Generation(#[from] AiError),
}

impl SessionError {
    /// Whether retrying the same call later can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Recommendations(_) => true,
            SessionError::Conversation(_) => false,
            SessionError::Generation(err) => !matches!(err, AiError::InvalidInput(_)),
        }
    }
}
