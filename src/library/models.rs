use crate::disclosure::{
    self_disclosure_level, MAX_FAVORITE_LEVEL, MAX_SINGING_CONFIDENCE, MIN_FAVORITE_LEVEL,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user of the experiment, identified by the provider's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: String,
    pub display_name: Option<String>,
}

/// A track in a participant's library, keyed by (track_id, participant_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    pub participant_id: String,
    pub name: String,
    pub artist_name: String,
    pub album_name: String,
    pub image_url: Option<String>,
    pub favorite_level: Option<u8>,
    pub singing_confidence: Option<u8>,
    pub popularity: Option<u8>,
    pub self_disclosure_level: u8,
}

impl Track {
    /// Recomputes `self_disclosure_level` from the current inputs.
    pub fn refresh_disclosure_level(&mut self) {
        self.self_disclosure_level =
            self_disclosure_level(self.favorite_level, self.singing_confidence, self.popularity);
    }
}

/// Descriptive data for a track as imported from the provider library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub track_id: String,
    pub name: String,
    pub artist_name: String,
    pub album_name: String,
    pub image_url: Option<String>,
    pub popularity: Option<u8>,
}

impl TrackMetadata {
    /// Builds the stored track, carrying over the participant's classification
    /// from `existing` if the track was already in their library.
    pub fn into_track(self, participant_id: &str, existing: Option<&Track>) -> Track {
        let mut track = Track {
            track_id: self.track_id,
            participant_id: participant_id.to_string(),
            name: self.name,
            artist_name: self.artist_name,
            album_name: self.album_name,
            image_url: self.image_url,
            favorite_level: existing.and_then(|t| t.favorite_level),
            singing_confidence: existing.and_then(|t| t.singing_confidence),
            popularity: self.popularity,
            self_disclosure_level: 0,
        };
        track.refresh_disclosure_level();
        track
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("favorite level {0} out of range (1-4)")]
    FavoriteLevelOutOfRange(u8),

    #[error("singing confidence {0} out of range (0-4)")]
    SingingConfidenceOutOfRange(u8),
}

/// The participant-editable classification inputs of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackClassification {
    pub favorite_level: Option<u8>,
    pub singing_confidence: Option<u8>,
}

impl TrackClassification {
    pub fn validate(&self) -> Result<(), ClassificationError> {
        if let Some(f) = self.favorite_level {
            if !(MIN_FAVORITE_LEVEL..=MAX_FAVORITE_LEVEL).contains(&f) {
                return Err(ClassificationError::FavoriteLevelOutOfRange(f));
            }
        }
        if let Some(c) = self.singing_confidence {
            if c > MAX_SINGING_CONFIDENCE {
                return Err(ClassificationError::SingingConfidenceOutOfRange(c));
            }
        }
        Ok(())
    }
}
