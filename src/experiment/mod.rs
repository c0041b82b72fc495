mod manager;
mod models;
mod progression;
mod recommendation;

pub use manager::{AdvanceOutcome, ExperimentManager, StepView};
pub use models::{Direction, ExperimentPath, NavigationState, Phase, Session};
pub use progression::{
    is_terminal, NextStep, PhaseState, ProgressionStrategy, Transition, FIRST_PHASE,
    TERMINAL_PHASE,
};
pub use recommendation::{
    bands_for_phase, unscoped_range_for_phase, LevelBands, RecommendationPolicy,
    RecommendationRequest, RECOMMENDATION_SIZE,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("session {0} not found")]
    SessionNotFound(i64),

    #[error("phase {0} not found in session")]
    PhaseNotFound(i64),

    #[error("navigation state does not match phase {0}")]
    StaleNavigation(i64),

    #[error("participant {0} not found")]
    ParticipantNotFound(String),

    #[error("phase {0} already has a selected track")]
    PhaseAlreadySelected(i64),

    #[error("no track selected")]
    MissingSelection,

    #[error("the experiment is complete")]
    TerminalPhase,

    #[error("participant {0} is not the acting participant of this step")]
    NotActingParticipant(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
