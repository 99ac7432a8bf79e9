//! `topicforge-core` — foundation building blocks shared by every crate.
//!
//! This crate contains **pure** primitives (no IO, no async): identifiers,
//! the domain error model, a clock abstraction and the aggregate traits.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;
pub mod preferences;

pub use aggregate::{Aggregate, AggregateRoot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{SessionId, SubjectId, TurnId, UserId};
pub use preferences::UserPreferences;
