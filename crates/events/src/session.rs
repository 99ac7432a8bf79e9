use topicforge_core::SessionId;

use crate::EventEnvelope;

/// Helper trait for session-scoped messages.
///
/// Lets a consumer that serves several sessions (e.g. a UI multiplexer) route
/// or reject messages without knowing their payload type.
pub trait SessionScoped {
    fn session_id(&self) -> SessionId;
}

impl<E> SessionScoped for EventEnvelope<E> {
    fn session_id(&self) -> SessionId {
        self.session_id()
    }
}
