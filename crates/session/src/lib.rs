//! `topicforge-session`
//!
//! **Responsibility:** the per-user session boundary the UI talks to.
//!
//! A session owns exactly one recommendation cache and one conversation. The
//! controller is glue only: it forwards requests, publishes readiness notices,
//! and runs generation after explicit confirmation.

pub mod config;
pub mod controller;
pub mod error;
pub mod registry;

pub use config::{ConfigError, Settings};
pub use controller::{GenerationOutcome, MessageOutcome, ReadinessNotice, SessionController};
pub use error::SessionError;
pub use registry::{ControllerFactory, SessionRegistry, in_memory_controller};
