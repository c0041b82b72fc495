mod schema;
mod sqlite_store;

pub use schema::STORE_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStore;

use crate::experiment::{Direction, ExperimentPath, Phase, Session};
use crate::library::{Participant, Track, TrackClassification, TrackMetadata};
use anyhow::Result;

pub trait LibraryStore: Send + Sync {
    /// Inserts the participant or updates their display name.
    fn upsert_participant(&self, participant: &Participant) -> Result<()>;

    /// Returns Ok(None) if the participant does not exist.
    fn get_participant(&self, participant_id: &str) -> Result<Option<Participant>>;

    /// Upserts library tracks for a participant, keeping their existing
    /// classification and recomputing the disclosure level.
    /// Returns the number of tracks written.
    fn upsert_library_tracks(
        &self,
        participant_id: &str,
        tracks: Vec<TrackMetadata>,
    ) -> Result<usize>;

    /// Returns Ok(None) if the participant has no such track.
    fn get_track(&self, track_id: &str, participant_id: &str) -> Result<Option<Track>>;

    /// Any library's copy of the track. Used when the owner is not known,
    /// such as a pick from the unscoped candidate pool.
    fn get_any_track(&self, track_id: &str) -> Result<Option<Track>>;

    fn get_participant_tracks(&self, participant_id: &str) -> Result<Vec<Track>>;

    /// Stores new classification inputs and recomputes the level using the
    /// stored popularity. Returns Ok(None) if the track does not exist.
    fn update_track_classification(
        &self,
        track_id: &str,
        participant_id: &str,
        classification: TrackClassification,
    ) -> Result<Option<Track>>;

    /// Recomputes the disclosure level of every track of the participant.
    /// Returns the number of tracks updated.
    fn recompute_disclosure_levels(&self, participant_id: &str) -> Result<usize>;

    /// Tracks of a participant whose level is in `levels` (never level 0),
    /// excluding `excluded_track_ids`.
    fn get_tracks_by_levels(
        &self,
        participant_id: &str,
        levels: &[u8],
        excluded_track_ids: &[String],
    ) -> Result<Vec<Track>>;

    /// Tracks of every participant whose level is within `min..=max`
    /// (never level 0).
    fn get_tracks_in_level_range(&self, min: u8, max: u8) -> Result<Vec<Track>>;
}

pub trait ExperimentStore: Send + Sync {
    fn create_session(
        &self,
        participant_a: &str,
        participant_b: &str,
        direction: Direction,
        path: ExperimentPath,
    ) -> Result<Session>;

    /// Returns Ok(None) if the session does not exist.
    fn get_session(&self, session_id: i64) -> Result<Option<Session>>;

    /// Inserts a new phase row whose selection belongs to `direction`.
    fn create_phase(&self, session_id: i64, phase_number: u32, direction: Direction)
        -> Result<Phase>;

    /// Returns Ok(None) if the phase does not exist.
    fn get_phase(&self, phase_id: i64) -> Result<Option<Phase>>;

    /// All phases of a session, in creation order.
    fn get_session_phases(&self, session_id: i64) -> Result<Vec<Phase>>;

    /// Sets the phase's selected track unless one is already set.
    /// Returns false if the phase already had a selection.
    fn set_phase_selection(
        &self,
        phase_id: i64,
        track_id: &str,
        participant_id: &str,
    ) -> Result<bool>;

    /// Track ids the participant selected in any phase of the session.
    fn get_selected_track_ids(&self, session_id: i64, participant_id: &str)
        -> Result<Vec<String>>;
}

pub trait FullStore: LibraryStore + ExperimentStore {}

impl<T: LibraryStore + ExperimentStore> FullStore for T {}
