use super::error::ApiError;
use super::state::ServerState;
use crate::oauth::ProviderTokens;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::future::Future;
use tracing::{debug, warn};

pub const COOKIE_PARTICIPANT_ID_KEY: &str = "participant_id";
pub const COOKIE_ACCESS_TOKEN_KEY: &str = "access_token";
pub const COOKIE_REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const COOKIE_TOKEN_EXPIRES_AT_KEY: &str = "token_expires_at";

const ALL_COOKIE_KEYS: [&str; 4] = [
    COOKIE_PARTICIPANT_ID_KEY,
    COOKIE_ACCESS_TOKEN_KEY,
    COOKIE_REFRESH_TOKEN_KEY,
    COOKIE_TOKEN_EXPIRES_AT_KEY,
];

fn cookie_value(jar: &CookieJar, key: &str) -> Option<String> {
    jar.get(key)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn session_cookie(key: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((key, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookies carrying the provider tokens, plus the participant id when known.
pub fn session_cookies(participant_id: Option<&str>, tokens: &ProviderTokens) -> CookieJar {
    let mut jar = CookieJar::new()
        .add(session_cookie(
            COOKIE_ACCESS_TOKEN_KEY,
            tokens.access_token.clone(),
        ))
        .add(session_cookie(
            COOKIE_TOKEN_EXPIRES_AT_KEY,
            tokens.expires_at.to_string(),
        ));
    if let Some(refresh_token) = &tokens.refresh_token {
        jar = jar.add(session_cookie(
            COOKIE_REFRESH_TOKEN_KEY,
            refresh_token.clone(),
        ));
    }
    if let Some(participant_id) = participant_id {
        jar = jar.add(session_cookie(
            COOKIE_PARTICIPANT_ID_KEY,
            participant_id.to_string(),
        ));
    }
    jar
}

/// Cookies that overwrite every session cookie with an expired, empty one.
pub fn cleared_cookies() -> CookieJar {
    ALL_COOKIE_KEYS.iter().fold(CookieJar::new(), |jar, key| {
        jar.add(
            Cookie::build(Cookie::new(*key, ""))
                .path("/")
                .http_only(true)
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
                .same_site(SameSite::Lax)
                .build(),
        )
    })
}

/// The participant identified by the `participant_id` cookie. Rejects with
/// 401 when the cookie is missing or names an unknown participant.
#[derive(Debug, Clone)]
pub struct ParticipantIdentity {
    pub participant_id: String,
}

impl FromRequestParts<ServerState> for ParticipantIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let participant_id = match cookie_value(&jar, COOKIE_PARTICIPANT_ID_KEY) {
            Some(id) => id,
            None => {
                debug!("No participant cookie.");
                return Err(ApiError::Unauthorized);
            }
        };

        if state.store.get_participant(&participant_id)?.is_none() {
            debug!("Participant {} not found", participant_id);
            return Err(ApiError::Unauthorized);
        }
        Ok(ParticipantIdentity { participant_id })
    }
}

/// Provider tokens read from the cookies. An expired access token is
/// refreshed during extraction; handlers return `updated_cookies()` so that
/// the browser picks up refreshed tokens.
#[derive(Debug)]
pub struct ProviderSession {
    tokens: ProviderTokens,
    refreshed: bool,
}

impl ProviderSession {
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    async fn refresh(&mut self, state: &ServerState) -> Result<(), ApiError> {
        let client = state.oauth_client.as_ref().ok_or(ApiError::Unauthorized)?;
        let refresh_token = self
            .tokens
            .refresh_token
            .clone()
            .ok_or(ApiError::Unauthorized)?;
        match client.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.tokens = tokens;
                self.refreshed = true;
                Ok(())
            }
            Err(err) => {
                warn!("Could not refresh access token: {:#}", err);
                Err(ApiError::Unauthorized)
            }
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.tokens.expires_at
    }

    /// Runs a provider call with the current access token. If the provider
    /// rejects the token, refreshes it once and retries.
    pub async fn call<T, E, F, Fut>(&mut self, state: &ServerState, f: F) -> Result<T, ApiError>
    where
        ApiError: From<E>,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match f(self.tokens.access_token.clone()).await.map_err(ApiError::from) {
            Err(ApiError::Unauthorized) => {
                debug!("Provider rejected the access token, refreshing");
                self.refresh(state).await?;
                f(self.tokens.access_token.clone())
                    .await
                    .map_err(ApiError::from)
            }
            result => result,
        }
    }

    /// Token cookies to send back, empty if nothing was refreshed.
    pub fn updated_cookies(&self) -> CookieJar {
        if self.refreshed {
            session_cookies(None, &self.tokens)
        } else {
            CookieJar::new()
        }
    }
}

impl FromRequestParts<ServerState> for ProviderSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let access_token = cookie_value(&jar, COOKIE_ACCESS_TOKEN_KEY);
        let refresh_token = cookie_value(&jar, COOKIE_REFRESH_TOKEN_KEY);
        if access_token.is_none() && refresh_token.is_none() {
            debug!("No provider tokens in cookies.");
            return Err(ApiError::Unauthorized);
        }

        let expires_at = cookie_value(&jar, COOKIE_TOKEN_EXPIRES_AT_KEY)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let mut session = ProviderSession {
            tokens: ProviderTokens {
                access_token: access_token.unwrap_or_default(),
                refresh_token,
                expires_at,
            },
            refreshed: false,
        };

        if session.tokens.is_expired(chrono::Utc::now().timestamp()) {
            debug!("Access token expired at {}, refreshing", expires_at);
            session.refresh(state).await?;
        }
        Ok(session)
    }
}
