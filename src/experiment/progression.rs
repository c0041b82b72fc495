//! Phase/direction progression.
//!
//! The two strategies are deliberately kept apart: they disagree on when a
//! new phase row is created, and each experiment path depends on its own
//! behavior.

use serde::{Deserialize, Serialize};

use super::models::Direction;

pub const FIRST_PHASE: u32 = 1;
pub const TERMINAL_PHASE: u32 = 9;

pub fn is_terminal(phase_number: u32) -> bool {
    phase_number >= TERMINAL_PHASE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStep {
    /// Back to the track step: the acting participant selects, or listens if
    /// the phase already has a selection.
    Track,
    Survey,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseState {
    pub phase_number: u32,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: PhaseState,
    /// When set, a new phase row with this number must be created and becomes
    /// the current phase. Otherwise the current phase row is kept.
    pub create_phase: Option<u32>,
    pub next_step: NextStep,
}

impl Transition {
    fn completed(state: PhaseState) -> Transition {
        Transition {
            next: state,
            create_phase: None,
            next_step: NextStep::Completion,
        }
    }

    fn enter_phase(phase_number: u32, direction: Direction, next_step: NextStep) -> Transition {
        let next = PhaseState {
            phase_number,
            direction,
        };
        if is_terminal(phase_number) {
            return Transition::completed(next);
        }
        Transition {
            next,
            create_phase: Some(phase_number),
            next_step,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionStrategy {
    /// Every advance toggles the direction and creates a phase row. Advancing
    /// from the second participant's turn moves to the next phase, passing
    /// through a survey.
    FixedToggle,
    /// The navigation direction is compared to the session's starting
    /// direction: on a match only the direction toggles, otherwise the next
    /// phase starts.
    SessionRelative,
}

impl ProgressionStrategy {
    /// Whether each turn gets its own phase row, so a row belongs to exactly
    /// one direction.
    pub fn row_per_direction(self) -> bool {
        matches!(self, ProgressionStrategy::FixedToggle)
    }

    pub fn advance(self, current: PhaseState, session_direction: Direction) -> Transition {
        if is_terminal(current.phase_number) {
            return Transition::completed(current);
        }

        let direction = current.direction.toggle();
        match self {
            ProgressionStrategy::FixedToggle => match current.direction {
                Direction::First => Transition {
                    next: PhaseState {
                        phase_number: current.phase_number,
                        direction,
                    },
                    create_phase: Some(current.phase_number),
                    next_step: NextStep::Track,
                },
                Direction::Second => {
                    Transition::enter_phase(current.phase_number + 1, direction, NextStep::Survey)
                }
            },
            ProgressionStrategy::SessionRelative => {
                if current.direction == session_direction {
                    Transition {
                        next: PhaseState {
                            phase_number: current.phase_number,
                            direction,
                        },
                        create_phase: None,
                        next_step: NextStep::Track,
                    }
                } else {
                    Transition::enter_phase(current.phase_number + 1, direction, NextStep::Track)
                }
            }
        }
    }
}
