//! Fake catalog provider and fake token endpoint.

use super::constants::*;
use async_trait::async_trait;
use axum::{routing::post, Form, Json, Router};
use duet_server::catalog_api::{
    AudioFeatures, CatalogApi, CatalogError, ProviderAlbum, ProviderArtist, ProviderProfile,
    ProviderTrack, SavedTrackItem, SavedTracksPage,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

const TOKEN_PREFIX: &str = "token-";
const REFRESH_PREFIX: &str = "refresh-";

/// Access token the fake provider accepts for `participant_id`.
pub fn access_token_for(participant_id: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, participant_id)
}

pub fn refresh_token_for(participant_id: &str) -> String {
    format!("{}{}", REFRESH_PREFIX, participant_id)
}

fn provider_track(id: &str, popularity: u8) -> ProviderTrack {
    ProviderTrack {
        id: id.to_string(),
        name: format!("Song {}", id),
        artists: vec![ProviderArtist {
            name: "Test Artist".to_string(),
        }],
        album: ProviderAlbum {
            name: "Test Album".to_string(),
            images: vec![],
        },
        popularity: Some(popularity),
    }
}

/// Recorded playback command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCall {
    Play {
        device_id: String,
        track_id: Option<String>,
        position_ms: Option<u64>,
    },
    Pause {
        device_id: String,
    },
    Seek {
        device_id: String,
        position_ms: u64,
    },
}

/// In-process stand-in for the catalog provider. Accepts only tokens of the
/// form `token-<participant>`.
pub struct FakeCatalogApi {
    libraries: HashMap<String, Vec<ProviderTrack>>,
    pub playback_calls: Mutex<Vec<PlaybackCall>>,
}

impl FakeCatalogApi {
    pub fn with_default_libraries() -> Self {
        let mut libraries = HashMap::new();
        libraries.insert(
            ALICE.to_string(),
            ALICE_POPULAR_TRACKS
                .iter()
                .map(|id| provider_track(id, POPULAR))
                .chain(ALICE_OBSCURE_TRACKS.iter().map(|id| provider_track(id, OBSCURE)))
                .collect(),
        );
        libraries.insert(
            BOB.to_string(),
            BOB_POPULAR_TRACKS
                .iter()
                .map(|id| provider_track(id, POPULAR))
                .chain(BOB_OBSCURE_TRACKS.iter().map(|id| provider_track(id, OBSCURE)))
                .collect(),
        );
        libraries.insert(CAROL.to_string(), vec![]);
        FakeCatalogApi {
            libraries,
            playback_calls: Mutex::new(vec![]),
        }
    }

    fn participant_for(&self, token: &str) -> Result<&str, CatalogError> {
        let participant_id = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(CatalogError::Unauthorized)?;
        self.libraries
            .get_key_value(participant_id)
            .map(|(k, _)| k.as_str())
            .ok_or(CatalogError::Unauthorized)
    }

    fn find_track(&self, track_id: &str) -> Option<&ProviderTrack> {
        self.libraries
            .values()
            .flatten()
            .find(|track| track.id == track_id)
    }
}

#[async_trait]
impl CatalogApi for FakeCatalogApi {
    async fn get_current_profile(&self, token: &str) -> Result<ProviderProfile, CatalogError> {
        let participant_id = self.participant_for(token)?;
        Ok(ProviderProfile {
            id: participant_id.to_string(),
            display_name: Some(participant_id.to_uppercase()),
        })
    }

    async fn get_saved_tracks_page(
        &self,
        token: &str,
        offset: u32,
        limit: u32,
    ) -> Result<SavedTracksPage, CatalogError> {
        let participant_id = self.participant_for(token)?;
        let tracks = &self.libraries[participant_id];
        let start = (offset as usize).min(tracks.len());
        let end = (start + limit as usize).min(tracks.len());
        Ok(SavedTracksPage {
            items: tracks[start..end]
                .iter()
                .cloned()
                .map(|track| SavedTrackItem { track })
                .collect(),
            next: (end < tracks.len()).then(|| format!("/me/tracks?offset={}", end)),
            total: Some(tracks.len() as u32),
        })
    }

    async fn get_track(&self, token: &str, track_id: &str) -> Result<ProviderTrack, CatalogError> {
        self.participant_for(token)?;
        self.find_track(track_id)
            .cloned()
            .ok_or_else(|| CatalogError::Upstream {
                status: 404,
                body: "non existing id".to_string(),
            })
    }

    async fn get_audio_features(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        self.participant_for(token)?;
        Ok(track_ids
            .iter()
            .map(|id| {
                (id != FEATURELESS_TRACK).then(|| AudioFeatures {
                    id: id.clone(),
                    danceability: Some(0.5),
                    energy: Some(0.5),
                    valence: Some(0.5),
                    tempo: Some(120.0),
                })
            })
            .collect())
    }

    async fn get_audio_feature(
        &self,
        token: &str,
        track_id: &str,
    ) -> Result<AudioFeatures, CatalogError> {
        let mut features = self
            .get_audio_features(token, &[track_id.to_string()])
            .await?;
        features
            .pop()
            .flatten()
            .ok_or_else(|| CatalogError::Upstream {
                status: 404,
                body: "no features".to_string(),
            })
    }

    async fn start_playback(
        &self,
        token: &str,
        device_id: &str,
        track_id: Option<&str>,
        position_ms: Option<u64>,
    ) -> Result<(), CatalogError> {
        self.participant_for(token)?;
        self.playback_calls.lock().unwrap().push(PlaybackCall::Play {
            device_id: device_id.to_string(),
            track_id: track_id.map(str::to_string),
            position_ms,
        });
        Ok(())
    }

    async fn pause_playback(&self, token: &str, device_id: &str) -> Result<(), CatalogError> {
        self.participant_for(token)?;
        self.playback_calls.lock().unwrap().push(PlaybackCall::Pause {
            device_id: device_id.to_string(),
        });
        Ok(())
    }

    async fn seek_playback(
        &self,
        token: &str,
        device_id: &str,
        position_ms: u64,
    ) -> Result<(), CatalogError> {
        self.participant_for(token)?;
        self.playback_calls.lock().unwrap().push(PlaybackCall::Seek {
            device_id: device_id.to_string(),
            position_ms,
        });
        Ok(())
    }
}

/// Token endpoint: the authorization code is the participant id, and a
/// refresh token `refresh-<participant>` yields a fresh `token-<participant>`.
async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> (axum::http::StatusCode, Json<Value>) {
    let participant_id = match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.contains_key("code_verifier") => form.get("code").cloned(),
        Some("refresh_token") => form
            .get("refresh_token")
            .and_then(|t| t.strip_prefix(REFRESH_PREFIX))
            .map(str::to_string),
        _ => None,
    };
    match participant_id {
        Some(id) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "access_token": access_token_for(&id),
                "refresh_token": refresh_token_for(&id),
                "expires_in": 3600,
            })),
        ),
        None => (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        ),
    }
}

pub fn token_endpoint_router() -> Router {
    Router::new().route("/token", post(token_endpoint))
}
