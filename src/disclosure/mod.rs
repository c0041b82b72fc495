//! Self-disclosure classification of tracks.
//!
//! A track's self-disclosure level (0-4) estimates how much a participant
//! reveals about themselves by sharing it. It is derived from three signals:
//! how much the participant likes the track, how confident they are singing
//! it, and how popular the track is on the provider.

use serde::{Deserialize, Serialize};

pub const MIN_FAVORITE_LEVEL: u8 = 1;
pub const MAX_FAVORITE_LEVEL: u8 = 4;
pub const MAX_SINGING_CONFIDENCE: u8 = 4;
pub const MAX_DISCLOSURE_LEVEL: u8 = 4;

/// Singing confidence value meaning "cannot sing this track".
pub const CANNOT_SING: u8 = 0;

const AFFECTION_THRESHOLD: u8 = 3;
const CONFIDENCE_THRESHOLD: u8 = 3;
const POPULARITY_THRESHOLD: u8 = 50;

/// The boolean view of a track's classification inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisclosureSignals {
    pub has_affection: bool,
    pub has_confidence: bool,
    pub is_popular: bool,
}

impl DisclosureSignals {
    pub fn from_inputs(
        favorite_level: Option<u8>,
        singing_confidence: Option<u8>,
        popularity: Option<u8>,
    ) -> Self {
        DisclosureSignals {
            has_affection: favorite_level.is_some_and(|f| f >= AFFECTION_THRESHOLD),
            has_confidence: singing_confidence.is_some_and(|c| c >= CONFIDENCE_THRESHOLD),
            is_popular: popularity.is_some_and(|p| p > POPULARITY_THRESHOLD),
        }
    }

    /// Maps the signals to a level. Not monotonic in any single signal:
    /// a beloved track that nobody knows and the participant won't sing
    /// discloses the most.
    pub fn level(&self) -> u8 {
        match (self.has_affection, self.has_confidence, self.is_popular) {
            (false, false, false) => 0,
            (false, true, true) => 1,
            (false, false, true) => 1,
            (false, true, false) => 2,
            (true, true, true) => 2,
            (true, false, true) => 3,
            (true, true, false) => 3,
            (true, false, false) => 4,
        }
    }
}

/// Computes the self-disclosure level of a track.
///
/// A track the participant explicitly cannot sing (`singing_confidence == 0`)
/// is always level 0, regardless of the other inputs.
pub fn self_disclosure_level(
    favorite_level: Option<u8>,
    singing_confidence: Option<u8>,
    popularity: Option<u8>,
) -> u8 {
    if singing_confidence == Some(CANNOT_SING) {
        return 0;
    }
    DisclosureSignals::from_inputs(favorite_level, singing_confidence, popularity).level()
}
