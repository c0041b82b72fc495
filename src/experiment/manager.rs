use super::models::{Direction, ExperimentPath, NavigationState, Phase, Session};
use super::progression::{is_terminal, NextStep, PhaseState, FIRST_PHASE};
use super::recommendation::RecommendationRequest;
use super::ExperimentError;
use crate::library::Track;
use crate::store::FullStore;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// What the acting participant should see for the current navigation state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum StepView {
    Completion,
    Selection {
        acting_participant_id: String,
        candidates: Vec<Track>,
    },
    Listening {
        phase_id: i64,
        selecting_participant_id: Option<String>,
        track: Option<Track>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdvanceOutcome {
    pub navigation: NavigationState,
    pub next_step: NextStep,
}

pub struct ExperimentManager {
    store: Arc<dyn FullStore>,
}

impl ExperimentManager {
    pub fn new(store: Arc<dyn FullStore>) -> Self {
        Self { store }
    }

    pub fn create_session(
        &self,
        participant_a: &str,
        participant_b: &str,
        direction: Direction,
        path: ExperimentPath,
    ) -> Result<Session, ExperimentError> {
        for participant_id in [participant_a, participant_b] {
            if self.store.get_participant(participant_id)?.is_none() {
                return Err(ExperimentError::ParticipantNotFound(
                    participant_id.to_string(),
                ));
            }
        }
        let session = self
            .store
            .create_session(participant_a, participant_b, direction, path)?;
        info!(
            "Created session {} ({} / {}, {:?} first, path {:?})",
            session.id, participant_a, participant_b, direction, path
        );
        Ok(session)
    }

    pub fn get_session(&self, session_id: i64) -> Result<Session, ExperimentError> {
        self.store
            .get_session(session_id)?
            .ok_or(ExperimentError::SessionNotFound(session_id))
    }

    pub fn list_phases(&self, session_id: i64) -> Result<Vec<Phase>, ExperimentError> {
        self.get_session(session_id)?;
        Ok(self.store.get_session_phases(session_id)?)
    }

    /// Creates the first phase row and returns the initial navigation state.
    pub fn start_session(&self, session_id: i64) -> Result<NavigationState, ExperimentError> {
        let session = self.get_session(session_id)?;
        let phase = self
            .store
            .create_phase(session.id, FIRST_PHASE, session.direction)?;
        Ok(NavigationState {
            session_id: session.id,
            phase_id: phase.id,
            phase_number: phase.phase_number,
            direction: session.direction,
        })
    }

    pub fn current_step<R: Rng + ?Sized>(
        &self,
        nav: &NavigationState,
        rng: &mut R,
    ) -> Result<StepView, ExperimentError> {
        if is_terminal(nav.phase_number) {
            return Ok(StepView::Completion);
        }

        let (session, phase) = self.load(nav)?;
        if let Some(track_id) = &phase.selected_track_id {
            let owned = match &phase.selecting_participant_id {
                Some(selector) => self.store.get_track(track_id, selector)?,
                None => None,
            };
            // Unscoped picks usually come from another participant's library.
            let track = match owned {
                Some(track) => Some(track),
                None => self.store.get_any_track(track_id)?,
            };
            return Ok(StepView::Listening {
                phase_id: phase.id,
                selecting_participant_id: phase.selecting_participant_id,
                track,
            });
        }

        let acting_participant_id = session.participant_for(nav.direction).to_string();
        let candidates = session.path.recommendation_policy().recommend(
            self.store.as_ref(),
            RecommendationRequest {
                session_id: session.id,
                participant_id: &acting_participant_id,
                phase_number: nav.phase_number,
            },
            rng,
        )?;
        Ok(StepView::Selection {
            acting_participant_id,
            candidates,
        })
    }

    /// Records the acting participant's choice for the current phase row.
    pub fn select_track(
        &self,
        nav: &NavigationState,
        participant_id: &str,
        track_id: Option<&str>,
    ) -> Result<Phase, ExperimentError> {
        let track_id = track_id
            .filter(|id| !id.is_empty())
            .ok_or(ExperimentError::MissingSelection)?;
        if is_terminal(nav.phase_number) {
            return Err(ExperimentError::TerminalPhase);
        }

        let (session, phase) = self.load(nav)?;
        if session.participant_for(nav.direction) != participant_id {
            return Err(ExperimentError::NotActingParticipant(
                participant_id.to_string(),
            ));
        }
        if !self
            .store
            .set_phase_selection(phase.id, track_id, participant_id)?
        {
            return Err(ExperimentError::PhaseAlreadySelected(phase.id));
        }
        debug!(
            "Participant {} selected {} in phase {} of session {}",
            participant_id, track_id, phase.phase_number, session.id
        );

        Ok(Phase {
            selected_track_id: Some(track_id.to_string()),
            selecting_participant_id: Some(participant_id.to_string()),
            ..phase
        })
    }

    /// Moves to the next step following the session's progression strategy.
    pub fn advance(&self, nav: &NavigationState) -> Result<AdvanceOutcome, ExperimentError> {
        if is_terminal(nav.phase_number) {
            return Ok(AdvanceOutcome {
                navigation: *nav,
                next_step: NextStep::Completion,
            });
        }

        let (session, _) = self.load(nav)?;
        let transition = session.path.progression().advance(
            PhaseState {
                phase_number: nav.phase_number,
                direction: nav.direction,
            },
            session.direction,
        );

        let phase_id = match transition.create_phase {
            Some(phase_number) => {
                self.store
                    .create_phase(session.id, phase_number, transition.next.direction)?
                    .id
            }
            None => nav.phase_id,
        };
        let navigation = NavigationState {
            session_id: session.id,
            phase_id,
            phase_number: transition.next.phase_number,
            direction: transition.next.direction,
        };
        debug!(
            "Session {} advanced from {:?} to {:?}",
            session.id, nav, navigation
        );
        Ok(AdvanceOutcome {
            navigation,
            next_step: transition.next_step,
        })
    }

    fn load(&self, nav: &NavigationState) -> Result<(Session, Phase), ExperimentError> {
        let session = self.get_session(nav.session_id)?;
        let phase = self
            .store
            .get_phase(nav.phase_id)?
            .filter(|phase| phase.session_id == session.id)
            .ok_or(ExperimentError::PhaseNotFound(nav.phase_id))?;

        // Rows are per direction only when the progression opens one per turn.
        let direction_mismatch = session.path.progression().row_per_direction()
            && phase.direction.is_some_and(|d| d != nav.direction);
        if phase.phase_number != nav.phase_number || direction_mismatch {
            return Err(ExperimentError::StaleNavigation(nav.phase_id));
        }
        Ok((session, phase))
    }
}
