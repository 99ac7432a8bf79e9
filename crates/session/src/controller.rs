use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use topicforge_ai::{GeneratedSubject, GenerationRequest, SubjectGenerator, generate_checked};
use topicforge_conversation::{
    ConversationEvent, ConversationState, ConversationTurn, GenerationTicket, Phase,
    ReadinessDetector, ReadinessSignals, ReadinessTriggered,
};
use topicforge_core::{Clock, DomainError, SessionId, SystemClock, UserId, UserPreferences};
use topicforge_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use topicforge_recommendations::{
    CacheRecord, PreferencesSource, RecommendationFetcher, RecommendationStore, RecordFetcher,
};

use crate::error::SessionError;

/// What the UI receives when a readiness trigger fires.
pub type ReadinessNotice = EventEnvelope<ReadinessTriggered>;

/// Result of appending a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub phase: Phase,
    pub epoch: u64,
    pub signals: ReadinessSignals,
    /// Set exactly once per epoch, on the message that made the conversation ready.
    pub triggered: Option<ReadinessTriggered>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(Vec<GeneratedSubject>),
    /// The conversation was reset while the generator was running.
    Discarded,
}

/// Per-session glue between the UI boundary, the recommendation cache, the
/// conversation state machine and the generator.
///
/// The controller never calls the generator on its own: a readiness trigger
/// is only announced, and generation waits for `generate_subjects`.
pub struct SessionController<F: RecordFetcher = RecommendationFetcher> {
    session_id: SessionId,
    user_id: UserId,
    store: RecommendationStore<F>,
    conversation: Mutex<ConversationState>,
    generator: Arc<dyn SubjectGenerator>,
    preferences: Arc<dyn PreferencesSource>,
    bus: Arc<InMemoryEventBus<ReadinessNotice>>,
    clock: Arc<dyn Clock>,
    sequence: AtomicU64,
}

impl<F: RecordFetcher> SessionController<F> {
    pub fn new(
        user_id: UserId,
        store: RecommendationStore<F>,
        detector: ReadinessDetector,
        generator: Arc<dyn SubjectGenerator>,
        preferences: Arc<dyn PreferencesSource>,
    ) -> Self {
        let session_id = SessionId::new();
        Self {
            session_id,
            user_id,
            store,
            conversation: Mutex::new(ConversationState::new(session_id, detector)),
            generator,
            preferences,
            bus: Arc::new(InMemoryEventBus::new()),
            clock: Arc::new(SystemClock),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_bus(mut self, bus: Arc<InMemoryEventBus<ReadinessNotice>>) -> Self {
        self.bus = bus;
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn store(&self) -> &RecommendationStore<F> {
        &self.store
    }

    // Recommendations

    pub async fn recommendations(&self, force_refresh: bool) -> Result<Arc<CacheRecord>, SessionError> {
        let record = self.store.get(force_refresh).await.inspect_err(|err| {
            warn!(
                session_id = %self.session_id,
                error = %err,
                "recommendations unavailable"
            );
        })?;
        debug!(
            session_id = %self.session_id,
            entries = record.len(),
            degraded = record.degraded(),
            "recommendations served"
        );
        Ok(record)
    }

    pub fn invalidate_recommendations(&self) {
        self.store.invalidate();
    }

    // Conversation

    pub fn current_phase(&self) -> Phase {
        self.conversation.lock().phase()
    }

    pub fn epoch(&self) -> u64 {
        self.conversation.lock().epoch()
    }

    pub fn signals(&self) -> ReadinessSignals {
        self.conversation.lock().signals()
    }

    /// A snapshot of the conversation.
    pub fn conversation(&self) -> ConversationState {
        self.conversation.lock().clone()
    }

    /// Readiness notices published after this call.
    pub fn subscribe_readiness(&self) -> Subscription<ReadinessNotice> {
        self.bus.subscribe()
    }

    /// Append a user message and evaluate readiness for it.
    pub fn send_message(&self, text: &str) -> Result<MessageOutcome, SessionError> {
        let turn = ConversationTurn::user(text, self.clock.now());
        let outcome = {
            let mut conversation = self.conversation.lock();
            let events = conversation.append(turn)?;
            let triggered = events.into_iter().find_map(|e| match e {
                ConversationEvent::ReadinessTriggered(t) => Some(t),
                _ => None,
            });
            MessageOutcome {
                phase: conversation.phase(),
                epoch: conversation.epoch(),
                signals: conversation.signals(),
                triggered,
            }
        };

        if let Some(trigger) = &outcome.triggered {
            info!(
                session_id = %self.session_id,
                epoch = trigger.epoch,
                user_chars = trigger.signals.user_chars,
                keyword_hits = trigger.signals.keyword_hits,
                "readiness triggered"
            );
            self.publish(trigger.clone());
        }
        Ok(outcome)
    }

    pub fn record_assistant_message(&self, text: &str) -> Result<(), SessionError> {
        let turn = ConversationTurn::assistant(text, self.clock.now());
        self.conversation.lock().append(turn)?;
        Ok(())
    }

    /// Start a new epoch. In-flight generations become stale.
    pub fn reset_conversation(&self) -> u64 {
        let epoch = self.conversation.lock().reset(self.clock.now());
        info!(session_id = %self.session_id, epoch, "conversation reset");
        epoch
    }

    /// Confirm the readiness prompt and run the generator.
    ///
    /// Fails without touching the conversation if it is not in a confirmable
    /// phase or the transcript is too short to build a request.
    pub async fn generate_subjects(&self) -> Result<GenerationOutcome, SessionError> {
        let preferences = match self.preferences.user_preferences().await {
            Ok(preferences) => preferences,
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "preferences unavailable; using defaults");
                UserPreferences::default()
            }
        };

        let (ticket, request) = {
            let mut conversation = self.conversation.lock();
            if !conversation.can_confirm_generation() {
                return Err(DomainError::invariant(format!(
                    "cannot confirm generation while {}",
                    conversation.phase()
                ))
                .into());
            }
            let request = GenerationRequest::from_transcript(conversation.user_texts(), &preferences)?;
            let ticket = conversation.confirm_generation(self.clock.now())?;
            (ticket, request)
        };
        info!(
            session_id = %self.session_id,
            epoch = ticket.epoch,
            sequence = ticket.sequence,
            count = request.count,
            "generation confirmed"
        );

        let pending = PendingGeneration {
            conversation: &self.conversation,
            clock: self.clock.as_ref(),
            session_id: self.session_id,
            ticket: Some(ticket),
        };
        let result = generate_checked(self.generator.as_ref(), &request).await;
        let applied = pending.settle(result.is_ok())?;
        if !applied {
            info!(
                session_id = %self.session_id,
                epoch = ticket.epoch,
                "generation result discarded after reset"
            );
            return Ok(GenerationOutcome::Discarded);
        }

        match result {
            Ok(subjects) => {
                info!(session_id = %self.session_id, subjects = subjects.len(), "generation completed");
                Ok(GenerationOutcome::Completed(subjects))
            }
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "generation failed");
                Err(err.into())
            }
        }
    }

    fn publish(&self, trigger: ReadinessTriggered) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            self.session_id,
            trigger.epoch,
            sequence,
            trigger,
        );
        if let Err(err) = self.bus.publish(envelope) {
            warn!(session_id = %self.session_id, error = ?err, "readiness notice not delivered");
        }
    }
}

/// A confirmed generation that has not been settled yet.
///
/// Dropped unsettled (the caller stopped polling, e.g. on a timeout), it
/// completes the ticket as failed so the conversation leaves `Generating`.
struct PendingGeneration<'a> {
    conversation: &'a Mutex<ConversationState>,
    clock: &'a dyn Clock,
    session_id: SessionId,
    ticket: Option<GenerationTicket>,
}

impl PendingGeneration<'_> {
    /// `Ok(false)` when a reset made the ticket stale.
    fn settle(mut self, succeeded: bool) -> Result<bool, DomainError> {
        match self.ticket.take() {
            Some(ticket) => self
                .conversation
                .lock()
                .complete_generation(ticket, succeeded, self.clock.now()),
            None => Ok(false),
        }
    }
}

impl Drop for PendingGeneration<'_> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        let settled = self
            .conversation
            .lock()
            .complete_generation(ticket, false, self.clock.now());
        match settled {
            Ok(applied) => warn!(
                session_id = %self.session_id,
                epoch = ticket.epoch,
                sequence = ticket.sequence,
                applied,
                "generation abandoned before completion"
            ),
            Err(err) => warn!(
                session_id = %self.session_id,
                error = %err,
                "abandoned generation could not be settled"
            ),
        }
    }
}
