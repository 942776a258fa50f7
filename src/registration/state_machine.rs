use serde::{Deserialize, Serialize};
use statig::prelude::*;

/// Events driving a registration session through its phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// A field changed
    Edit,
    /// User asked to submit
    Submit,
    /// Synchronous validation finished
    Validated { valid: bool, needs_uniqueness: bool },
    /// Store answered the uniqueness query
    UniquenessChecked { taken: bool },
    /// Store accepted the record
    Appended,
    /// Store could not be reached or refused the write
    StoreFailed,
}

/// Externally visible phase of a registration session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Editing,
    Validating,
    CheckingUniqueness,
    Submitting,
    Done,
    Failed,
}

impl FlowPhase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            FlowPhase::Validating | FlowPhase::CheckingUniqueness | FlowPhase::Submitting
        )
    }
}

/// Phase machine for one registration session
#[derive(Debug, Default)]
pub struct RegistrationMachine;

impl RegistrationMachine {
    fn enter(&mut self, phase: FlowPhase) {
        tracing::debug!(to = ?phase, "Registration phase change");
    }
}

/// Map the machine's current state onto the public phase
pub(crate) fn phase_of(state: &State) -> FlowPhase {
    match state {
        State::Editing { .. } => FlowPhase::Editing,
        State::Validating { .. } => FlowPhase::Validating,
        State::CheckingUniqueness { .. } => FlowPhase::CheckingUniqueness,
        State::Submitting { .. } => FlowPhase::Submitting,
        State::Done { .. } => FlowPhase::Done,
        State::Failed { .. } => FlowPhase::Failed,
    }
}

#[state_machine(initial = "State::editing()")]
impl RegistrationMachine {
    #[state]
    fn editing(&mut self, event: &FlowEvent) -> Outcome<State> {
        match event {
            FlowEvent::Submit => {
                self.enter(FlowPhase::Validating);
                Transition(State::validating())
            }
            _ => Handled,
        }
    }

    #[state]
    fn validating(&mut self, event: &FlowEvent) -> Outcome<State> {
        match event {
            FlowEvent::Validated { valid: false, .. } => {
                self.enter(FlowPhase::Editing);
                Transition(State::editing())
            }
            FlowEvent::Validated {
                valid: true,
                needs_uniqueness: true,
            } => {
                self.enter(FlowPhase::CheckingUniqueness);
                Transition(State::checking_uniqueness())
            }
            FlowEvent::Validated {
                valid: true,
                needs_uniqueness: false,
            } => {
                self.enter(FlowPhase::Submitting);
                Transition(State::submitting())
            }
            _ => Handled,
        }
    }

    #[state]
    fn checking_uniqueness(&mut self, event: &FlowEvent) -> Outcome<State> {
        match event {
            FlowEvent::UniquenessChecked { taken: true } => {
                self.enter(FlowPhase::Editing);
                Transition(State::editing())
            }
            FlowEvent::UniquenessChecked { taken: false } => {
                self.enter(FlowPhase::Submitting);
                Transition(State::submitting())
            }
            FlowEvent::StoreFailed => {
                self.enter(FlowPhase::Failed);
                Transition(State::failed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn submitting(&mut self, event: &FlowEvent) -> Outcome<State> {
        match event {
            FlowEvent::Appended => {
                self.enter(FlowPhase::Done);
                Transition(State::done())
            }
            FlowEvent::StoreFailed => {
                self.enter(FlowPhase::Failed);
                Transition(State::failed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn done(&mut self, event: &FlowEvent) -> Outcome<State> {
        match event {
            FlowEvent::Edit => {
                self.enter(FlowPhase::Editing);
                Transition(State::editing())
            }
            FlowEvent::Submit => {
                self.enter(FlowPhase::Validating);
                Transition(State::validating())
            }
            _ => Handled,
        }
    }

    /// Stays failed until the next edit or submit; the draft is left intact
    #[state]
    fn failed(&mut self, event: &FlowEvent) -> Outcome<State> {
        match event {
            FlowEvent::Edit => {
                self.enter(FlowPhase::Editing);
                Transition(State::editing())
            }
            FlowEvent::Submit => {
                self.enter(FlowPhase::Validating);
                Transition(State::validating())
            }
            _ => Handled,
        }
    }
}
