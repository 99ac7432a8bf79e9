use thiserror::Error;

/// Recommendation retrieval failure.
///
/// `Clone` because a single coalesced fetch delivers its result to every
/// caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure, including timeouts.
    #[error("network error: {0}")]
    Network(String),

    /// The collaborator answered with zero usable entries.
    #[error("collaborator returned no usable entries")]
    EmptyResult,

    /// The preferences could not be turned into a usable query.
    #[error("invalid recommendation context: {0}")]
    InvalidContext(String),
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn invalid_context(msg: impl Into<String>) -> Self {
        Self::InvalidContext(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::EmptyResult => "empty_result",
            FetchError::InvalidContext(_) => "invalid_context",
        }
    }
}
