use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use topicforge_core::{Aggregate, AggregateRoot, DomainError, SessionId};
use topicforge_events::{Event, execute};

use crate::phase::Phase;
use crate::readiness::{ReadinessDetector, ReadinessSignals, ReadinessTally};
use crate::turn::ConversationTurn;

/// Proof that a generation was confirmed in a given epoch.
///
/// Handed back on completion so results from before a reset can be told apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationTicket {
    pub epoch: u64,
    pub sequence: u64,
}

/// Command: AppendTurn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendTurn {
    pub turn: ConversationTurn,
}

/// Command: ResetConversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetConversation {
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmGeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmGeneration {
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteGeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteGeneration {
    pub ticket: GenerationTicket,
    pub succeeded: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationCommand {
    AppendTurn(AppendTurn),
    Reset(ResetConversation),
    ConfirmGeneration(ConfirmGeneration),
    CompleteGeneration(CompleteGeneration),
}

/// Event: TurnAppended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAppended {
    pub session_id: SessionId,
    pub epoch: u64,
    pub turn: ConversationTurn,
}

/// Event: PhaseChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChanged {
    pub session_id: SessionId,
    pub epoch: u64,
    pub from: Phase,
    pub to: Phase,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReadinessTriggered. Emitted at most once per epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessTriggered {
    pub session_id: SessionId,
    pub epoch: u64,
    pub signals: ReadinessSignals,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ConversationReset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationReset {
    pub session_id: SessionId,
    pub previous_epoch: u64,
    pub epoch: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GenerationConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfirmed {
    pub session_id: SessionId,
    pub ticket: GenerationTicket,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GenerationCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCompleted {
    pub session_id: SessionId,
    pub ticket: GenerationTicket,
    pub succeeded: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationEvent {
    TurnAppended(TurnAppended),
    PhaseChanged(PhaseChanged),
    ReadinessTriggered(ReadinessTriggered),
    ConversationReset(ConversationReset),
    GenerationConfirmed(GenerationConfirmed),
    GenerationCompleted(GenerationCompleted),
}

impl Event for ConversationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConversationEvent::TurnAppended(_) => "conversation.turn.appended",
            ConversationEvent::PhaseChanged(_) => "conversation.phase.changed",
            ConversationEvent::ReadinessTriggered(_) => "conversation.readiness.triggered",
            ConversationEvent::ConversationReset(_) => "conversation.reset",
            ConversationEvent::GenerationConfirmed(_) => "conversation.generation.confirmed",
            ConversationEvent::GenerationCompleted(_) => "conversation.generation.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ConversationEvent::TurnAppended(e) => e.turn.at,
            ConversationEvent::PhaseChanged(e) => e.occurred_at,
            ConversationEvent::ReadinessTriggered(e) => e.occurred_at,
            ConversationEvent::ConversationReset(e) => e.occurred_at,
            ConversationEvent::GenerationConfirmed(e) => e.occurred_at,
            ConversationEvent::GenerationCompleted(e) => e.occurred_at,
        }
    }
}

impl Event for ReadinessTriggered {
    fn event_type(&self) -> &'static str {
        "conversation.readiness.triggered"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Aggregate root: ConversationState.
///
/// Holds the turn log of the current epoch, the phase, and the readiness
/// tally. `Ready` is entered at most once per epoch; only a reset re-arms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    id: SessionId,
    detector: ReadinessDetector,
    turns: Vec<ConversationTurn>,
    phase: Phase,
    epoch: u64,
    tally: ReadinessTally,
    triggered_this_epoch: bool,
    last_generation_failed: bool,
    in_flight: Option<GenerationTicket>,
    generation_seq: u64,
    version: u64,
}

impl ConversationState {
    pub fn new(id: SessionId, detector: ReadinessDetector) -> Self {
        Self {
            id,
            detector,
            turns: Vec::new(),
            phase: Phase::Idle,
            epoch: 0,
            tally: ReadinessTally::default(),
            triggered_this_epoch: false,
            last_generation_failed: false,
            in_flight: None,
            generation_seq: 0,
            version: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn signals(&self) -> ReadinessSignals {
        self.tally.signals()
    }

    pub fn detector(&self) -> &ReadinessDetector {
        &self.detector
    }

    pub fn matched_keywords(&self) -> Vec<&str> {
        self.detector.matched_keywords(&self.tally).collect()
    }

    pub fn triggered_this_epoch(&self) -> bool {
        self.triggered_this_epoch
    }

    pub fn in_flight_generation(&self) -> Option<GenerationTicket> {
        self.in_flight
    }

    /// User-authored texts of the current epoch, oldest first.
    pub fn user_texts(&self) -> impl Iterator<Item = &str> {
        self.turns.iter().filter(|t| t.is_user()).map(|t| t.text.as_str())
    }

    pub fn can_confirm_generation(&self) -> bool {
        match self.phase {
            Phase::Ready => true,
            Phase::Cooldown | Phase::Gathering => self.last_generation_failed,
            Phase::Idle | Phase::Generating => false,
        }
    }

    /// Append a turn and run the phase transition for it.
    pub fn append(&mut self, turn: ConversationTurn) -> Result<Vec<ConversationEvent>, DomainError> {
        execute(self, &ConversationCommand::AppendTurn(AppendTurn { turn }))
    }

    /// Clear the log, return to `Idle`, and start a new epoch. Returns it.
    pub fn reset(&mut self, at: DateTime<Utc>) -> u64 {
        let event = self.reset_event(&ResetConversation { occurred_at: at });
        self.apply(&event);
        self.epoch
    }

    pub fn confirm_generation(&mut self, at: DateTime<Utc>) -> Result<GenerationTicket, DomainError> {
        let events = execute(
            self,
            &ConversationCommand::ConfirmGeneration(ConfirmGeneration { occurred_at: at }),
        )?;
        events
            .iter()
            .find_map(|e| match e {
                ConversationEvent::GenerationConfirmed(c) => Some(c.ticket),
                _ => None,
            })
            .ok_or_else(|| DomainError::invariant("confirmation produced no ticket"))
    }

    /// Settle a generation. `Ok(false)` means the ticket belongs to an
    /// earlier epoch and was ignored.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let events = execute(
            self,
            &ConversationCommand::CompleteGeneration(CompleteGeneration {
                ticket,
                succeeded,
                occurred_at: at,
            }),
        )?;
        Ok(!events.is_empty())
    }

    /// Reset is accepted from every phase, so it has no failing path.
    fn reset_event(&self, cmd: &ResetConversation) -> ConversationEvent {
        ConversationEvent::ConversationReset(ConversationReset {
            session_id: self.id,
            previous_epoch: self.epoch,
            epoch: self.epoch + 1,
            occurred_at: cmd.occurred_at,
        })
    }

    fn phase_changed(&self, from: Phase, to: Phase, at: DateTime<Utc>) -> ConversationEvent {
        ConversationEvent::PhaseChanged(PhaseChanged {
            session_id: self.id,
            epoch: self.epoch,
            from,
            to,
            occurred_at: at,
        })
    }

    fn handle_append(&self, cmd: &AppendTurn) -> Result<Vec<ConversationEvent>, DomainError> {
        let turn = &cmd.turn;
        if turn.text.trim().is_empty() {
            return Err(DomainError::validation("turn text cannot be empty"));
        }

        let mut events = vec![ConversationEvent::TurnAppended(TurnAppended {
            session_id: self.id,
            epoch: self.epoch,
            turn: turn.clone(),
        })];
        if !turn.is_user() {
            return Ok(events);
        }

        let mut phase = self.phase;
        if matches!(phase, Phase::Idle | Phase::Cooldown) {
            events.push(self.phase_changed(phase, Phase::Gathering, turn.at));
            phase = Phase::Gathering;
        }

        if phase == Phase::Gathering && !self.triggered_this_epoch {
            let tally = self.detector.observe(&self.tally, &turn.text);
            if self.detector.is_satisfied(&tally) {
                events.push(self.phase_changed(phase, Phase::Ready, turn.at));
                events.push(ConversationEvent::ReadinessTriggered(ReadinessTriggered {
                    session_id: self.id,
                    epoch: self.epoch,
                    signals: tally.signals(),
                    occurred_at: turn.at,
                }));
            }
        }

        Ok(events)
    }

    fn handle_confirm(&self, cmd: &ConfirmGeneration) -> Result<Vec<ConversationEvent>, DomainError> {
        if !self.can_confirm_generation() {
            return Err(DomainError::invariant(format!(
                "cannot confirm generation while {}",
                self.phase
            )));
        }
        let ticket = GenerationTicket {
            epoch: self.epoch,
            sequence: self.generation_seq + 1,
        };
        Ok(vec![
            self.phase_changed(self.phase, Phase::Generating, cmd.occurred_at),
            ConversationEvent::GenerationConfirmed(GenerationConfirmed {
                session_id: self.id,
                ticket,
                occurred_at: cmd.occurred_at,
            }),
        ])
    }

    fn handle_complete(&self, cmd: &CompleteGeneration) -> Result<Vec<ConversationEvent>, DomainError> {
        if cmd.ticket.epoch < self.epoch {
            return Ok(vec![]);
        }
        if self.in_flight != Some(cmd.ticket) {
            return Err(DomainError::invariant("no generation in flight for this ticket"));
        }
        Ok(vec![
            ConversationEvent::GenerationCompleted(GenerationCompleted {
                session_id: self.id,
                ticket: cmd.ticket,
                succeeded: cmd.succeeded,
                occurred_at: cmd.occurred_at,
            }),
            self.phase_changed(Phase::Generating, Phase::Cooldown, cmd.occurred_at),
        ])
    }
}

impl AggregateRoot for ConversationState {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for ConversationState {
    type Command = ConversationCommand;
    type Event = ConversationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ConversationEvent::TurnAppended(e) => {
                if e.turn.is_user() {
                    self.tally = self.detector.observe(&self.tally, &e.turn.text);
                }
                self.turns.push(e.turn.clone());
            }
            ConversationEvent::PhaseChanged(e) => {
                self.phase = e.to;
            }
            ConversationEvent::ReadinessTriggered(_) => {
                self.triggered_this_epoch = true;
            }
            ConversationEvent::ConversationReset(e) => {
                self.turns.clear();
                self.tally = ReadinessTally::default();
                self.phase = Phase::Idle;
                self.epoch = e.epoch;
                self.triggered_this_epoch = false;
                self.last_generation_failed = false;
                self.in_flight = None;
            }
            ConversationEvent::GenerationConfirmed(e) => {
                self.generation_seq = e.ticket.sequence;
                self.in_flight = Some(e.ticket);
            }
            ConversationEvent::GenerationCompleted(e) => {
                self.in_flight = None;
                self.last_generation_failed = !e.succeeded;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ConversationCommand::AppendTurn(cmd) => self.handle_append(cmd),
            ConversationCommand::Reset(cmd) => Ok(vec![self.reset_event(cmd)]),
            ConversationCommand::ConfirmGeneration(cmd) => self.handle_confirm(cmd),
            ConversationCommand::CompleteGeneration(cmd) => self.handle_complete(cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::ReadinessPolicy;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn state() -> ConversationState {
        ConversationState::new(SessionId::new(), ReadinessDetector::default())
    }

    fn user(text: &str) -> ConversationTurn {
        ConversationTurn::user(text, t0())
    }

    const FIRST: &str = "Je veux développer";
    const SECOND: &str = "un projet de mémoire sur l'IA pour analyser les données étudiantes et créer un système d'automatisation";
    const THIRD: &str = "Les étudiants pourraient consulter leurs résultats chaque semaine sur un tableau de bord !";

    fn drive_to_ready(state: &mut ConversationState) {
        state.append(user(FIRST)).unwrap();
        state.append(user(SECOND)).unwrap();
        state.append(user(THIRD)).unwrap();
        assert_eq!(state.phase(), Phase::Ready);
    }

    fn triggers(events: &[ConversationEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ConversationEvent::ReadinessTriggered(_)))
            .count()
    }

    #[test]
    fn worked_example_reaches_ready_on_third_message() {
        assert_eq!(FIRST.chars().count(), 18);
        assert_eq!(SECOND.chars().count(), 103);
        assert_eq!(THIRD.chars().count(), 90);

        let mut state = state();

        state.append(user(FIRST)).unwrap();
        assert_eq!(state.phase(), Phase::Gathering);

        state.append(user(SECOND)).unwrap();
        assert_eq!(state.phase(), Phase::Gathering);
        assert_eq!(state.signals().user_chars, 121);
        let hits_before = state.signals().keyword_hits;
        assert!(hits_before >= 4);

        let events = state.append(user(THIRD)).unwrap();
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.signals().user_chars, 211);
        assert_eq!(state.signals().keyword_hits, hits_before);
        assert_eq!(triggers(&events), 1);
    }

    #[test]
    fn assistant_turns_do_not_move_the_phase() {
        let mut state = state();
        state
            .append(ConversationTurn::assistant("Bonjour ! Quel est votre projet de mémoire ?", t0()))
            .unwrap();

        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.signals(), ReadinessSignals::default());
        assert_eq!(state.turns().len(), 1);
    }

    #[test]
    fn blank_turn_is_rejected_without_side_effects() {
        let mut state = state();
        assert!(state.append(user("   ")).is_err());
        assert!(state.turns().is_empty());
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn single_long_turn_can_go_straight_to_ready() {
        let mut state = state();
        let text = format!("{FIRST} {SECOND} {THIRD}");
        let events = state.append(user(&text)).unwrap();

        let phases: Vec<(Phase, Phase)> = events
            .iter()
            .filter_map(|e| match e {
                ConversationEvent::PhaseChanged(p) => Some((p.from, p.to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![(Phase::Idle, Phase::Gathering), (Phase::Gathering, Phase::Ready)]
        );
    }

    #[test]
    fn full_generation_cycle_does_not_retrigger() {
        let mut state = state();
        drive_to_ready(&mut state);

        let ticket = state.confirm_generation(t0()).unwrap();
        assert_eq!(state.phase(), Phase::Generating);
        assert!(state.complete_generation(ticket, true, t0()).unwrap());
        assert_eq!(state.phase(), Phase::Cooldown);

        let events = state.append(user(SECOND)).unwrap();
        assert_eq!(state.phase(), Phase::Gathering);
        assert_eq!(triggers(&events), 0);
        assert!(state.confirm_generation(t0()).is_err());
    }

    #[test]
    fn failed_generation_can_be_confirmed_again() {
        let mut state = state();
        drive_to_ready(&mut state);

        let first = state.confirm_generation(t0()).unwrap();
        state.complete_generation(first, false, t0()).unwrap();
        assert!(state.can_confirm_generation());

        let second = state.confirm_generation(t0()).unwrap();
        assert_eq!(second.epoch, first.epoch);
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn confirm_requires_ready() {
        let mut state = state();
        assert!(state.confirm_generation(t0()).is_err());
        state.append(user(FIRST)).unwrap();
        assert!(state.confirm_generation(t0()).is_err());
    }

    #[test]
    fn reset_mid_generation_discards_stale_completion() {
        let mut state = state();
        drive_to_ready(&mut state);
        let ticket = state.confirm_generation(t0()).unwrap();

        let epoch = state.reset(t0() + Duration::seconds(5));
        assert_eq!(epoch, 1);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.turns().is_empty());

        assert!(!state.complete_generation(ticket, true, t0()).unwrap());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn reset_helper_matches_reset_command() {
        let mut via_helper = state();
        drive_to_ready(&mut via_helper);
        let mut via_command = via_helper.clone();

        via_helper.reset(t0());
        let events = execute(
            &mut via_command,
            &ConversationCommand::Reset(ResetConversation { occurred_at: t0() }),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(via_helper, via_command);
        assert_eq!(via_helper.epoch(), 1);
    }

    #[test]
    fn completing_unknown_ticket_in_current_epoch_is_an_error() {
        let mut state = state();
        drive_to_ready(&mut state);
        let bogus = GenerationTicket {
            epoch: state.epoch(),
            sequence: 42,
        };
        assert!(state.complete_generation(bogus, true, t0()).is_err());
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let detector = ReadinessDetector::new(
            ReadinessPolicy::default()
                .with_thresholds(5, 1)
                .with_keywords(["thesis"]),
        );
        let mut state = ConversationState::new(SessionId::new(), detector);
        state.append(user("my thesis")).unwrap();
        assert_eq!(state.phase(), Phase::Ready);
    }

    fn arb_turn() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(SECOND.to_string()),
            Just(THIRD.to_string()),
            Just("je veux créer une application mobile et web".to_string()),
            "[a-zé ]{1,80}".prop_filter("non-blank", |s| !s.trim().is_empty()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: however many qualifying turns follow, `Ready` is entered
        /// at most once per epoch.
        #[test]
        fn ready_entered_at_most_once_per_epoch(turns in prop::collection::vec(arb_turn(), 1..30)) {
            let mut state = state();
            let mut fired = 0;
            for text in &turns {
                let events = state.append(user(text)).unwrap();
                fired += triggers(&events);
                if state.phase() == Phase::Ready {
                    let ticket = state.confirm_generation(t0()).unwrap();
                    state.complete_generation(ticket, true, t0()).unwrap();
                }
            }
            prop_assert!(fired <= 1);
            prop_assert_eq!(fired == 1, state.triggered_this_epoch());
        }

        /// Property: a reset returns to `Idle`, bumps the epoch, and lets a new
        /// qualifying sequence trigger exactly once more.
        #[test]
        fn reset_rearms_detection(extra in prop::collection::vec(arb_turn(), 0..10), resets in 1usize..4) {
            let mut state = state();
            for round in 0..resets {
                let before = state.epoch();
                let mut fired = 0;
                for text in [FIRST, SECOND, THIRD] {
                    fired += triggers(&state.append(user(text)).unwrap());
                }
                for text in &extra {
                    fired += triggers(&state.append(user(text)).unwrap());
                }
                prop_assert_eq!(fired, 1, "round {}", round);

                let epoch = state.reset(t0());
                prop_assert_eq!(epoch, before + 1);
                prop_assert_eq!(state.phase(), Phase::Idle);
                prop_assert_eq!(state.signals(), ReadinessSignals::default());
            }
        }
    }
}
