use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    #[error("invalid generation input: {0}")]
    InvalidInput(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The model answered but produced no usable subject.
    #[error("generation returned no subjects")]
    EmptyResponse,
}
