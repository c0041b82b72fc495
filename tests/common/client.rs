//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for all duet-server endpoints.
//! Cookies set by the server are kept in a jar; tests can also plant
//! cookies directly to simulate stale or expired tokens.
//!
//! When API routes or request formats change, update only this file.
#![allow(dead_code)]

use super::constants::*;
use super::server::TestServer;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Response, StatusCode, Url};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
    jar: Arc<Jar>,
}

impl TestClient {
    /// Creates a client without any cookie. Redirects are not followed.
    pub fn new(base_url: String) -> Self {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            jar,
        }
    }

    /// Runs the whole login flow for `participant_id`.
    ///
    /// # Panics
    ///
    /// Panics if login fails (indicates test infrastructure problem).
    pub async fn logged_in(server: &TestServer, participant_id: &str) -> Self {
        let client = Self::new(server.base_url.clone());
        let response = client.login_as(participant_id).await;
        assert_eq!(
            response.status(),
            StatusCode::SEE_OTHER,
            "Login of {} failed: {:?}",
            participant_id,
            response.text().await
        );
        client
    }

    /// Logs in, imports the library and returns the client.
    pub async fn with_library(server: &TestServer, participant_id: &str) -> Self {
        let client = Self::logged_in(server, participant_id).await;
        let response = client.import_library().await;
        assert_eq!(response.status(), StatusCode::OK);
        client
    }

    /// Plants a raw cookie, e.g. `"access_token=stale"`.
    pub fn set_cookie(&self, cookie: &str) {
        let url = self.url("/");
        self.jar.add_cookie_str(&format!("{}; Path=/", cookie), &url);
    }

    /// Current value of a cookie in the jar.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.url("/"))?;
        let header = header.to_str().ok()?.to_string();
        header.split("; ").find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{}", self.base_url, path)).expect("Invalid test URL")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// GET /v1/auth/login
    pub async fn login(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/login"))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/callback
    pub async fn callback(&self, code: &str, state: &str) -> Response {
        self.client
            .get(self.url("/v1/auth/callback"))
            .query(&[("code", code), ("state", state)])
            .send()
            .await
            .expect("Callback request failed")
    }

    /// Starts a login and completes it with the participant id as code.
    pub async fn login_as(&self, participant_id: &str) -> Response {
        let state = self.start_login().await;
        self.callback(participant_id, &state).await
    }

    /// GET /v1/auth/login, returning the `state` query parameter of the
    /// authorize redirect.
    pub async fn start_login(&self) -> String {
        let response = self.login().await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get("location")
            .expect("Login did not redirect")
            .to_str()
            .unwrap()
            .to_string();
        Url::parse(&location)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("No state in authorize URL")
    }

    /// GET /v1/auth/token
    pub async fn access_token(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/token"))
            .send()
            .await
            .expect("Token request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/logout"))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Catalog & Library Endpoints
    // ========================================================================

    /// GET /v1/catalog/track/{id}
    pub async fn get_catalog_track(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/catalog/track/{}", id)))
            .send()
            .await
            .expect("Catalog track request failed")
    }

    /// POST /v1/library/import
    pub async fn import_library(&self) -> Response {
        self.client
            .post(self.url("/v1/library/import"))
            .send()
            .await
            .expect("Import request failed")
    }

    /// GET /v1/library/tracks
    pub async fn list_tracks(&self) -> Response {
        self.client
            .get(self.url("/v1/library/tracks"))
            .send()
            .await
            .expect("List tracks request failed")
    }

    /// GET /v1/library/tracks/{id}
    pub async fn get_track(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/library/tracks/{}", id)))
            .send()
            .await
            .expect("Get track request failed")
    }

    /// PUT /v1/library/tracks/{id}/classification
    pub async fn classify_track(
        &self,
        id: &str,
        favorite_level: Option<u8>,
        singing_confidence: Option<u8>,
    ) -> Response {
        self.client
            .put(self.url(&format!("/v1/library/tracks/{}/classification", id)))
            .json(&json!({
                "favorite_level": favorite_level,
                "singing_confidence": singing_confidence,
            }))
            .send()
            .await
            .expect("Classify request failed")
    }

    /// POST /v1/library/recompute
    pub async fn recompute_levels(&self) -> Response {
        self.client
            .post(self.url("/v1/library/recompute"))
            .send()
            .await
            .expect("Recompute request failed")
    }

    /// POST /v1/library/verify
    pub async fn verify_audio_features(&self) -> Response {
        self.client
            .post(self.url("/v1/library/verify"))
            .send()
            .await
            .expect("Verify request failed")
    }

    // ========================================================================
    // Experiment Endpoints
    // ========================================================================

    /// POST /v1/experiment/sessions
    pub async fn create_session(
        &self,
        participant_a: &str,
        participant_b: &str,
        direction: &str,
        path: &str,
    ) -> Response {
        self.client
            .post(self.url("/v1/experiment/sessions"))
            .json(&json!({
                "participant_a": participant_a,
                "participant_b": participant_b,
                "direction": direction,
                "path": path,
            }))
            .send()
            .await
            .expect("Create session request failed")
    }

    /// GET /v1/experiment/sessions/{id}
    pub async fn get_session(&self, id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/experiment/sessions/{}", id)))
            .send()
            .await
            .expect("Get session request failed")
    }

    /// GET /v1/experiment/sessions/{id}/phases
    pub async fn list_phases(&self, id: i64) -> Response {
        self.client
            .get(self.url(&format!("/v1/experiment/sessions/{}/phases", id)))
            .send()
            .await
            .expect("List phases request failed")
    }

    /// POST /v1/experiment/sessions/{id}/start
    pub async fn start_session(&self, id: i64) -> Response {
        self.client
            .post(self.url(&format!("/v1/experiment/sessions/{}/start", id)))
            .send()
            .await
            .expect("Start session request failed")
    }

    /// GET /v1/experiment/step
    pub async fn current_step(&self, navigation: &Value) -> Response {
        let query: Vec<(String, String)> = navigation
            .as_object()
            .expect("Navigation must be an object")
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
        self.client
            .get(self.url("/v1/experiment/step"))
            .query(&query)
            .send()
            .await
            .expect("Step request failed")
    }

    /// POST /v1/experiment/select
    pub async fn select_track(&self, navigation: &Value, track_id: Option<&str>) -> Response {
        let mut body = navigation.clone();
        body["track_id"] = json!(track_id);
        self.client
            .post(self.url("/v1/experiment/select"))
            .json(&body)
            .send()
            .await
            .expect("Select request failed")
    }

    /// POST /v1/experiment/advance
    pub async fn advance(&self, navigation: &Value) -> Response {
        self.client
            .post(self.url("/v1/experiment/advance"))
            .json(navigation)
            .send()
            .await
            .expect("Advance request failed")
    }

    // ========================================================================
    // Playback Endpoints
    // ========================================================================

    /// PUT /v1/playback/play
    pub async fn play(&self, track_id: Option<&str>, position_ms: Option<u64>) -> Response {
        self.client
            .put(self.url("/v1/playback/play"))
            .json(&json!({
                "device_id": DEVICE_ID,
                "track_id": track_id,
                "position_ms": position_ms,
            }))
            .send()
            .await
            .expect("Play request failed")
    }

    /// PUT /v1/playback/pause
    pub async fn pause(&self) -> Response {
        self.client
            .put(self.url("/v1/playback/pause"))
            .json(&json!({ "device_id": DEVICE_ID }))
            .send()
            .await
            .expect("Pause request failed")
    }

    /// PUT /v1/playback/seek
    pub async fn seek(&self, position_ms: u64) -> Response {
        self.client
            .put(self.url("/v1/playback/seek"))
            .json(&json!({ "device_id": DEVICE_ID, "position_ms": position_ms }))
            .send()
            .await
            .expect("Seek request failed")
    }
}
