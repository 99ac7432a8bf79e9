//! Conversation log and the readiness state machine that decides when enough
//! has been said to offer subject generation.

pub mod phase;
pub mod readiness;
pub mod state;
pub mod turn;

pub use phase::Phase;
pub use readiness::{ReadinessDetector, ReadinessPolicy, ReadinessSignals, ReadinessTally};
pub use state::{
    AppendTurn, CompleteGeneration, ConfirmGeneration, ConversationCommand, ConversationEvent,
    ConversationReset, ConversationState, GenerationCompleted, GenerationConfirmed,
    GenerationTicket, PhaseChanged, ReadinessTriggered, ResetConversation, TurnAppended,
};
pub use turn::{ConversationTurn, Sender};
