use serde::{Deserialize, Serialize};
use uuid::Uuid;

use topicforge_core::SessionId;

/// Envelope for an event published outside its session.
///
/// Notes:
/// - **Session scoping** is carried here via `session_id`; there is no
///   cross-session stream.
/// - `epoch` is the conversation epoch the event belongs to. Consumers compare
///   it with the current epoch and drop anything older.
/// - `sequence_number` is monotonically increasing per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    session_id: SessionId,
    epoch: u64,

    /// Monotonically increasing position in the session's event stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        session_id: SessionId,
        epoch: u64,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            session_id,
            epoch,
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
