use anyhow::Result;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::error::ApiError;
use super::experiment_routes::make_experiment_routes;
use super::library_routes::make_library_routes;
use super::playback_routes::make_playback_routes;
use super::session::{
    cleared_cookies, session_cookies, ProviderSession, COOKIE_PARTICIPANT_ID_KEY,
};
use super::{log_requests, state::*, ServerConfig};
use crate::library::Participant;
use crate::oauth::OAuthClient;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub participant_id: Option<String>,
    pub login_enabled: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(jar: CookieJar, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: state.version.clone(),
        participant_id: jar
            .get(COOKIE_PARTICIPANT_ID_KEY)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty()),
        login_enabled: state.oauth_client.is_some(),
    };
    Json(stats)
}

fn require_oauth(state: &ServerState) -> Result<&OAuthClient, ApiError> {
    state
        .oauth_client
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("login is not configured".to_string()))
}

async fn login(State(state): State<ServerState>) -> Result<Redirect, ApiError> {
    let client = require_oauth(&state)?;
    state.auth_state_store.cleanup_expired().await;

    let (url, auth_state) = client.authorize_url()?;
    state.auth_state_store.store(auth_state).await;
    Ok(Redirect::to(&url))
}

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn callback(
    State(state): State<ServerState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    let client = require_oauth(&state)?;
    if let Some(error) = params.error {
        warn!("Provider denied authorization: {}", error);
        return Err(ApiError::BadRequest(format!(
            "authorization denied: {}",
            error
        )));
    }
    let code = params
        .code
        .ok_or_else(|| ApiError::BadRequest("missing code".to_string()))?;
    let csrf_token = params
        .state
        .ok_or_else(|| ApiError::BadRequest("missing state".to_string()))?;

    let stored = state
        .auth_state_store
        .take(&csrf_token)
        .await
        .ok_or_else(|| ApiError::BadRequest("unknown or expired login state".to_string()))?;
    let tokens = client
        .exchange_code(&code, &csrf_token, &stored)
        .await
        .map_err(|err| {
            warn!("Login failed: {:#}", err);
            ApiError::Unauthorized
        })?;

    let profile = state
        .catalog_api
        .get_current_profile(&tokens.access_token)
        .await?;
    state.store.upsert_participant(&Participant {
        participant_id: profile.id.clone(),
        display_name: profile.display_name,
    })?;
    info!("Participant {} logged in", profile.id);

    Ok((
        session_cookies(Some(&profile.id), &tokens),
        Redirect::to(client.post_login_redirect()),
    ))
}

#[derive(Serialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_at: i64,
}

/// Hands the current access token to the browser playback SDK.
async fn access_token(session: ProviderSession) -> impl IntoResponse {
    let body = AccessTokenResponse {
        access_token: session.access_token().to_string(),
        expires_at: session.expires_at(),
    };
    (session.updated_cookies(), Json(body))
}

async fn logout() -> impl IntoResponse {
    (cleared_cookies(), StatusCode::OK)
}

async fn get_catalog_track(
    State(state): State<ServerState>,
    mut session: ProviderSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let api = &state.catalog_api;
    let id = id.as_str();
    let track = session
        .call(&state, |token| async move { api.get_track(&token, id).await })
        .await?;
    Ok((session.updated_cookies(), Json(track)))
}

pub fn make_app(
    config: ServerConfig,
    store: GuardedStore,
    catalog_api: GuardedCatalogApi,
    oauth_client: Option<OAuthClient>,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), store, catalog_api, oauth_client);

    let auth_routes: Router = Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/token", get(access_token))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let catalog_routes: Router = Router::new()
        .route("/track/{id}", get(get_catalog_track))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/catalog", catalog_routes)
        .nest("/v1/library", make_library_routes(state.clone()))
        .nest("/v1/experiment", make_experiment_routes(state.clone()))
        .nest("/v1/playback", make_playback_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    store: GuardedStore,
    catalog_api: GuardedCatalogApi,
    oauth_client: Option<OAuthClient>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, store, catalog_api, oauth_client)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
