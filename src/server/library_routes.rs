//! Routes over the calling participant's own library.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use super::error::ApiError;
use super::session::{ParticipantIdentity, ProviderSession};
use super::state::{GuardedStore, ServerState};
use crate::catalog_api::VerificationReport;
use crate::library::{
    import_library, verify_library_audio_features, Track, TrackClassification,
};

#[derive(Serialize)]
struct ImportResponse {
    imported: usize,
}

#[derive(Serialize)]
struct RecomputeResponse {
    updated: usize,
}

async fn import(
    State(state): State<ServerState>,
    identity: ParticipantIdentity,
    mut session: ProviderSession,
) -> Result<(CookieJar, Json<ImportResponse>), ApiError> {
    let store = state.store.as_ref();
    let api = state.catalog_api.as_ref();
    let participant_id = identity.participant_id.as_str();
    let imported = session
        .call(&state, |token| async move {
            import_library(store, api, &token, participant_id).await
        })
        .await?;
    Ok((session.updated_cookies(), Json(ImportResponse { imported })))
}

async fn list_tracks(
    State(store): State<GuardedStore>,
    identity: ParticipantIdentity,
) -> Result<Json<Vec<Track>>, ApiError> {
    Ok(Json(store.get_participant_tracks(&identity.participant_id)?))
}

async fn get_track(
    State(store): State<GuardedStore>,
    identity: ParticipantIdentity,
    Path(track_id): Path<String>,
) -> Result<Json<Track>, ApiError> {
    store
        .get_track(&track_id, &identity.participant_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("track {} not in library", track_id)))
}

async fn classify_track(
    State(store): State<GuardedStore>,
    identity: ParticipantIdentity,
    Path(track_id): Path<String>,
    Json(classification): Json<TrackClassification>,
) -> Result<Json<Track>, ApiError> {
    classification.validate()?;
    store
        .update_track_classification(&track_id, &identity.participant_id, classification)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("track {} not in library", track_id)))
}

async fn recompute(
    State(store): State<GuardedStore>,
    identity: ParticipantIdentity,
) -> Result<Json<RecomputeResponse>, ApiError> {
    let updated = store.recompute_disclosure_levels(&identity.participant_id)?;
    Ok(Json(RecomputeResponse { updated }))
}

async fn verify(
    State(state): State<ServerState>,
    identity: ParticipantIdentity,
    mut session: ProviderSession,
) -> Result<(CookieJar, Json<VerificationReport>), ApiError> {
    let store = state.store.as_ref();
    let api = state.catalog_api.as_ref();
    let participant_id = identity.participant_id.as_str();
    let report = session
        .call(&state, |token| async move {
            verify_library_audio_features(store, api, &token, participant_id).await
        })
        .await?;
    Ok((session.updated_cookies(), Json(report)))
}

pub fn make_library_routes(state: ServerState) -> Router {
    Router::new()
        .route("/import", post(import))
        .route("/tracks", get(list_tracks))
        .route("/tracks/{id}", get(get_track))
        .route("/tracks/{id}/classification", put(classify_track))
        .route("/recompute", post(recompute))
        .route("/verify", post(verify))
        .with_state(state)
}
