//! Client side of the external track catalog provider.

mod client;
mod models;
mod verification;

pub use client::HttpCatalogApi;
pub use models::{
    AudioFeatures, AudioFeaturesBatch, ProviderAlbum, ProviderArtist, ProviderImage,
    ProviderProfile, ProviderTrack, SavedTrackItem, SavedTracksPage,
};
pub use verification::{verify_audio_features, VerificationReport, AUDIO_FEATURES_BATCH_SIZE};

use async_trait::async_trait;
use thiserror::Error;

/// Page size used when walking a participant's saved tracks.
pub const SAVED_TRACKS_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("access token rejected by provider")]
    Unauthorized,

    #[error("provider error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("connection error: {0}")]
    Transport(String),

    #[error("invalid provider response: {0}")]
    Decode(String),
}

/// The provider operations the server needs. Every call takes the
/// participant's current access token.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn get_current_profile(&self, token: &str) -> Result<ProviderProfile, CatalogError>;

    async fn get_saved_tracks_page(
        &self,
        token: &str,
        offset: u32,
        limit: u32,
    ) -> Result<SavedTracksPage, CatalogError>;

    async fn get_track(&self, token: &str, track_id: &str) -> Result<ProviderTrack, CatalogError>;

    /// One entry per id, in request order.
    async fn get_audio_features(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, CatalogError>;

    async fn get_audio_feature(
        &self,
        token: &str,
        track_id: &str,
    ) -> Result<AudioFeatures, CatalogError>;

    /// Starts (or resumes, when `track_id` is None) playback on `device_id`.
    async fn start_playback(
        &self,
        token: &str,
        device_id: &str,
        track_id: Option<&str>,
        position_ms: Option<u64>,
    ) -> Result<(), CatalogError>;

    async fn pause_playback(&self, token: &str, device_id: &str) -> Result<(), CatalogError>;

    async fn seek_playback(
        &self,
        token: &str,
        device_id: &str,
        position_ms: u64,
    ) -> Result<(), CatalogError>;
}
