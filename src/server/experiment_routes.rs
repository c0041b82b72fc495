//! Session setup and step navigation. The client carries a
//! `NavigationState` from one step to the next.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiError;
use super::session::ParticipantIdentity;
use super::state::{GuardedExperimentManager, ServerState};
use crate::experiment::{
    AdvanceOutcome, Direction, ExperimentPath, NavigationState, Phase, Session, StepView,
};

#[derive(Deserialize, Debug)]
struct CreateSessionBody {
    participant_a: String,
    participant_b: String,
    direction: Direction,
    path: ExperimentPath,
}

#[derive(Deserialize, Debug)]
struct SelectBody {
    #[serde(flatten)]
    navigation: NavigationState,
    track_id: Option<String>,
}

async fn create_session(
    State(manager): State<GuardedExperimentManager>,
    _identity: ParticipantIdentity,
    Json(body): Json<CreateSessionBody>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = manager.create_session(
        &body.participant_a,
        &body.participant_b,
        body.direction,
        body.path,
    )?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(manager): State<GuardedExperimentManager>,
    _identity: ParticipantIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(manager.get_session(id)?))
}

async fn list_phases(
    State(manager): State<GuardedExperimentManager>,
    _identity: ParticipantIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Phase>>, ApiError> {
    Ok(Json(manager.list_phases(id)?))
}

async fn start_session(
    State(manager): State<GuardedExperimentManager>,
    _identity: ParticipantIdentity,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<NavigationState>), ApiError> {
    Ok((StatusCode::CREATED, Json(manager.start_session(id)?)))
}

async fn current_step(
    State(manager): State<GuardedExperimentManager>,
    _identity: ParticipantIdentity,
    Query(navigation): Query<NavigationState>,
) -> Result<Json<StepView>, ApiError> {
    let step = manager.current_step(&navigation, &mut rand::rng())?;
    Ok(Json(step))
}

async fn select_track(
    State(manager): State<GuardedExperimentManager>,
    identity: ParticipantIdentity,
    Json(body): Json<SelectBody>,
) -> Result<Json<Phase>, ApiError> {
    let phase = manager.select_track(
        &body.navigation,
        &identity.participant_id,
        body.track_id.as_deref(),
    )?;
    Ok(Json(phase))
}

async fn advance(
    State(manager): State<GuardedExperimentManager>,
    _identity: ParticipantIdentity,
    Json(navigation): Json<NavigationState>,
) -> Result<Json<AdvanceOutcome>, ApiError> {
    Ok(Json(manager.advance(&navigation)?))
}

pub fn make_experiment_routes(state: ServerState) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/phases", get(list_phases))
        .route("/sessions/{id}/start", post(start_session))
        .route("/step", get(current_step))
        .route("/select", post(select_track))
        .route("/advance", post(advance))
        .with_state(state)
}
