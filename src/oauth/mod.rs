//! OAuth authorization-code flow against the catalog provider.
//!
//! - Authorization URL generation with PKCE (S256)
//! - Code exchange and token refresh
//! - Server-side state kept between /login and /callback

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::OAuthSettings;

/// Seconds an authorization state stays valid.
pub const AUTH_STATE_TTL_SEC: i64 = 300;

/// Tokens are treated as expired this many seconds early.
const EXPIRY_MARGIN_SEC: i64 = 30;

const CSRF_TOKEN_LENGTH: usize = 32;
const PKCE_VERIFIER_LENGTH: usize = 64;

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// State stored during the authorization flow (between /login and /callback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    /// CSRF token, sent as the `state` parameter
    pub csrf_token: String,
    /// PKCE code verifier (never leaves the server)
    pub pkce_verifier: String,
    pub created_at: i64,
}

impl AuthState {
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.created_at > AUTH_STATE_TTL_SEC
    }
}

/// Tokens for one participant, as carried in cookies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl ProviderTokens {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - EXPIRY_MARGIN_SEC
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

pub struct OAuthClient {
    http: reqwest::Client,
    settings: OAuthSettings,
}

impl OAuthClient {
    pub fn new(settings: OAuthSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        info!(
            "OAuth client configured for {} (client id {})",
            settings.authorize_url, settings.client_id
        );
        Ok(Self { http, settings })
    }

    pub fn post_login_redirect(&self) -> &str {
        &self.settings.post_login_redirect
    }

    /// Generate an authorization URL.
    ///
    /// Returns the URL to redirect the user to, along with the state that must
    /// be stored server-side and validated in the callback.
    pub fn authorize_url(&self) -> Result<(String, AuthState)> {
        let state = AuthState {
            csrf_token: random_string(CSRF_TOKEN_LENGTH),
            pkce_verifier: random_string(PKCE_VERIFIER_LENGTH),
            created_at: chrono::Utc::now().timestamp(),
        };
        let challenge = pkce_challenge(&state.pkce_verifier);
        let scope = self.settings.scopes.join(" ");

        let url = reqwest::Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state.csrf_token.as_str()),
                ("code_challenge_method", "S256"),
                ("code_challenge", challenge.as_str()),
            ],
        )
        .context("Invalid OAuth authorize URL")?;

        debug!(
            "Generated authorization URL with state: {}",
            state.csrf_token
        );
        Ok((url.to_string(), state))
    }

    /// Exchange an authorization code for tokens, after validating the
    /// returned state against the stored one.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        stored_state: &AuthState,
    ) -> Result<ProviderTokens> {
        if state != stored_state.csrf_token {
            return Err(anyhow!("CSRF state mismatch"));
        }
        if stored_state.is_expired(chrono::Utc::now().timestamp()) {
            return Err(anyhow!("Authorization state expired"));
        }

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("code_verifier", stored_state.pkce_verifier.as_str()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let tokens = self
            .request_tokens(&form)
            .await
            .context("Code exchange failed")?;
        if tokens.refresh_token.is_none() {
            warn!("Code exchange returned no refresh token");
        }
        Ok(tokens)
    }

    /// Obtain a new access token. The provider may omit the refresh token in
    /// its answer, in which case the current one is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.settings.client_id.as_str()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let mut tokens = self
            .request_tokens(&form)
            .await
            .context("Token refresh failed")?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        debug!("Refreshed access token, expires at {}", tokens.expires_at);
        Ok(tokens)
    }

    async fn request_tokens(&self, form: &[(&str, &str)]) -> Result<ProviderTokens> {
        let response = self
            .http
            .post(&self.settings.token_url)
            .form(form)
            .send()
            .await
            .context("Failed to reach token endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token endpoint returned {}: {}", status, body);
            bail!("Token endpoint returned {}", status);
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;
        Ok(ProviderTokens {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at: chrono::Utc::now().timestamp() + parsed.expires_in,
        })
    }
}

/// In-memory store for pending authorization states, keyed by CSRF token.
pub struct AuthStateStore {
    states: RwLock<HashMap<String, AuthState>>,
}

impl AuthStateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    pub async fn store(&self, state: AuthState) {
        let key = state.csrf_token.clone();
        let mut states = self.states.write().await;
        states.insert(key, state);
    }

    /// Retrieve and remove an auth state by CSRF token
    pub async fn take(&self, csrf_token: &str) -> Option<AuthState> {
        let mut states = self.states.write().await;
        states.remove(csrf_token)
    }

    pub async fn cleanup_expired(&self) {
        let now = chrono::Utc::now().timestamp();
        let mut states = self.states.write().await;
        states.retain(|_, state| !state.is_expired(now));
    }
}

impl Default for AuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}
