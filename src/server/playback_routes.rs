//! Thin proxy over the provider's player endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    routing::put,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::error::ApiError;
use super::session::ProviderSession;
use super::state::ServerState;

#[derive(Deserialize, Debug)]
struct PlayBody {
    device_id: String,
    track_id: Option<String>,
    position_ms: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct PauseBody {
    device_id: String,
}

#[derive(Deserialize, Debug)]
struct SeekBody {
    device_id: String,
    position_ms: u64,
}

async fn play(
    State(state): State<ServerState>,
    mut session: ProviderSession,
    Json(body): Json<PlayBody>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let api = &state.catalog_api;
    let body = &body;
    session
        .call(&state, |token| async move {
            api.start_playback(
                &token,
                &body.device_id,
                body.track_id.as_deref(),
                body.position_ms,
            )
            .await
        })
        .await?;
    Ok((session.updated_cookies(), StatusCode::NO_CONTENT))
}

async fn pause(
    State(state): State<ServerState>,
    mut session: ProviderSession,
    Json(body): Json<PauseBody>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let api = &state.catalog_api;
    let device_id = body.device_id.as_str();
    session
        .call(&state, |token| async move {
            api.pause_playback(&token, device_id).await
        })
        .await?;
    Ok((session.updated_cookies(), StatusCode::NO_CONTENT))
}

async fn seek(
    State(state): State<ServerState>,
    mut session: ProviderSession,
    Json(body): Json<SeekBody>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let api = &state.catalog_api;
    let device_id = body.device_id.as_str();
    let position_ms = body.position_ms;
    session
        .call(&state, |token| async move {
            api.seek_playback(&token, device_id, position_ms).await
        })
        .await?;
    Ok((session.updated_cookies(), StatusCode::NO_CONTENT))
}

pub fn make_playback_routes(state: ServerState) -> Router {
    Router::new()
        .route("/play", put(play))
        .route("/pause", put(pause))
        .route("/seek", put(seek))
        .with_state(state)
}
