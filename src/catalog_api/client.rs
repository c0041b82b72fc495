//! HTTP client for the catalog provider's web API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{
    AudioFeatures, AudioFeaturesBatch, PlayBody, ProviderProfile, ProviderTrack, SavedTracksPage,
};
use super::{CatalogApi, CatalogError};

pub struct HttpCatalogApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogApi {
    /// Create a new catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the provider API (e.g., "https://api.spotify.com/v1")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, CatalogError> {
        let response = request.send().await.map_err(|e| {
            warn!("Failed to reach provider for {}: {}", what, e);
            CatalogError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            debug!("Provider rejected token for {}", what);
            return Err(CatalogError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Provider error for {}: status {} body {}", what, status, body);
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, CatalogError> {
        let request = self.client.get(self.url(path)).bearer_auth(token).query(query);
        let response = self.send(request, what).await?;
        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("{}: {}", what, e)))
    }

    async fn put_player(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&PlayBody>,
        what: &str,
    ) -> Result<(), CatalogError> {
        let mut request = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .query(query);
        request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        self.send(request, what).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn get_current_profile(&self, token: &str) -> Result<ProviderProfile, CatalogError> {
        self.get_json(token, "/me", &[], "current profile").await
    }

    async fn get_saved_tracks_page(
        &self,
        token: &str,
        offset: u32,
        limit: u32,
    ) -> Result<SavedTracksPage, CatalogError> {
        self.get_json(
            token,
            "/me/tracks",
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
            "saved tracks",
        )
        .await
    }

    async fn get_track(&self, token: &str, track_id: &str) -> Result<ProviderTrack, CatalogError> {
        self.get_json(
            token,
            &format!("/tracks/{}", urlencoding::encode(track_id)),
            &[],
            "track",
        )
        .await
    }

    async fn get_audio_features(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        let batch: AudioFeaturesBatch = self
            .get_json(
                token,
                "/audio-features",
                &[("ids", track_ids.join(","))],
                "audio features",
            )
            .await?;
        Ok(batch.audio_features)
    }

    async fn get_audio_feature(
        &self,
        token: &str,
        track_id: &str,
    ) -> Result<AudioFeatures, CatalogError> {
        self.get_json(
            token,
            &format!("/audio-features/{}", urlencoding::encode(track_id)),
            &[],
            "audio feature",
        )
        .await
    }

    async fn start_playback(
        &self,
        token: &str,
        device_id: &str,
        track_id: Option<&str>,
        position_ms: Option<u64>,
    ) -> Result<(), CatalogError> {
        let body = PlayBody {
            uris: track_id.map(|id| vec![format!("spotify:track:{}", id)]),
            position_ms,
        };
        self.put_player(
            token,
            "/me/player/play",
            &[("device_id", device_id.to_string())],
            Some(&body),
            "start playback",
        )
        .await
    }

    async fn pause_playback(&self, token: &str, device_id: &str) -> Result<(), CatalogError> {
        self.put_player(
            token,
            "/me/player/pause",
            &[("device_id", device_id.to_string())],
            None,
            "pause playback",
        )
        .await
    }

    async fn seek_playback(
        &self,
        token: &str,
        device_id: &str,
        position_ms: u64,
    ) -> Result<(), CatalogError> {
        self.put_player(
            token,
            "/me/player/seek",
            &[
                ("device_id", device_id.to_string()),
                ("position_ms", position_ms.to_string()),
            ],
            None,
            "seek playback",
        )
        .await
    }
}
