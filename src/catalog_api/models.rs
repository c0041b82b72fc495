//! Wire models of the catalog provider's JSON API.

use serde::{Deserialize, Serialize};

use crate::library::TrackMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderArtist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ProviderImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ProviderArtist>,
    pub album: ProviderAlbum,
    #[serde(default)]
    pub popularity: Option<u8>,
}

impl From<ProviderTrack> for TrackMetadata {
    fn from(track: ProviderTrack) -> Self {
        let artist_name = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        TrackMetadata {
            track_id: track.id,
            name: track.name,
            artist_name,
            album_name: track.album.name,
            // Provider lists images largest first.
            image_url: track.album.images.into_iter().next().map(|i| i.url),
            popularity: track.popularity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTrackItem {
    pub track: ProviderTrack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTracksPage {
    pub items: Vec<SavedTrackItem>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    #[serde(default)]
    pub danceability: Option<f32>,
    #[serde(default)]
    pub energy: Option<f32>,
    #[serde(default)]
    pub valence: Option<f32>,
    #[serde(default)]
    pub tempo: Option<f32>,
}

/// The batch endpoint answers with one entry per requested id, `null` when
/// the provider has no features for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeaturesBatch {
    pub audio_features: Vec<Option<AudioFeatures>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct PlayBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
}
