//! `topicforge-ai`
//!
//! **Responsibility:** boundary to the subject-generation model.
//!
//! This crate is intentionally **not** part of the conversation state machine:
//! - It never decides *when* to generate; the readiness detector does that.
//! - It never mutates conversation state.
//! - It turns a transcript into a request and a model response into subjects.

pub mod generator;
pub mod request;
pub mod result;
pub mod subject;

pub use generator::{SubjectGenerator, TemplateGenerator, generate_checked};
pub use request::{DEFAULT_SUBJECT_COUNT, GenerationRequest, MIN_TRANSCRIPT_CHARS};
pub use result::AiError;
pub use subject::GeneratedSubject;
