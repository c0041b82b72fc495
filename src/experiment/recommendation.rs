//! Phase-appropriate candidate selection.
//!
//! Two independent policies exist, one per experiment path. `Banded` is
//! scoped to the acting participant, prefers one disclosure band and falls
//! back to the band below, and never re-offers a track the participant
//! already chose in the session. `Unscoped` draws from a level range across
//! every participant's library with no exclusion.

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::debug;

use crate::library::Track;
use crate::store::FullStore;

pub const RECOMMENDATION_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelBands {
    pub preferred: &'static [u8],
    pub fallback: &'static [u8],
}

/// Returns None for phases that offer no candidates.
pub fn bands_for_phase(phase_number: u32) -> Option<LevelBands> {
    let (preferred, fallback): (&'static [u8], &'static [u8]) = match phase_number {
        1 | 2 => (&[1], &[]),
        3 | 4 => (&[2], &[1]),
        5 | 6 => (&[3], &[2]),
        7 | 8 => (&[4], &[3]),
        _ => return None,
    };
    Some(LevelBands {
        preferred,
        fallback,
    })
}

/// Returns None for phases that offer no candidates.
pub fn unscoped_range_for_phase(phase_number: u32) -> Option<RangeInclusive<u8>> {
    match phase_number {
        1 | 2 => Some(1..=1),
        3 | 4 => Some(1..=2),
        5 | 6 => Some(2..=3),
        7 | 8 => Some(3..=4),
        _ => None,
    }
}

/// Whose candidates are being fetched, and within which session.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRequest<'a> {
    pub session_id: i64,
    pub participant_id: &'a str,
    pub phase_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPolicy {
    Banded,
    Unscoped,
}

impl RecommendationPolicy {
    /// The full candidate pool, before shuffling and truncation.
    pub fn candidate_pool(
        self,
        store: &dyn FullStore,
        request: RecommendationRequest,
    ) -> Result<Vec<Track>> {
        match self {
            RecommendationPolicy::Banded => banded_pool(store, request),
            RecommendationPolicy::Unscoped => {
                let Some(range) = unscoped_range_for_phase(request.phase_number) else {
                    return Ok(vec![]);
                };
                store.get_tracks_in_level_range(*range.start(), *range.end())
            }
        }
    }

    /// Up to `RECOMMENDATION_SIZE` tracks picked uniformly from the pool.
    pub fn recommend<R: Rng + ?Sized>(
        self,
        store: &dyn FullStore,
        request: RecommendationRequest,
        rng: &mut R,
    ) -> Result<Vec<Track>> {
        let mut pool = self.candidate_pool(store, request)?;
        debug!(
            "{:?} pool for {} in phase {}: {} tracks",
            self,
            request.participant_id,
            request.phase_number,
            pool.len()
        );
        pool.shuffle(rng);
        pool.truncate(RECOMMENDATION_SIZE);
        Ok(pool)
    }
}

fn banded_pool(store: &dyn FullStore, request: RecommendationRequest) -> Result<Vec<Track>> {
    let Some(bands) = bands_for_phase(request.phase_number) else {
        return Ok(vec![]);
    };
    let already_selected =
        store.get_selected_track_ids(request.session_id, request.participant_id)?;

    let mut pool =
        store.get_tracks_by_levels(request.participant_id, bands.preferred, &already_selected)?;
    if pool.len() < RECOMMENDATION_SIZE && !bands.fallback.is_empty() {
        let fallback =
            store.get_tracks_by_levels(request.participant_id, bands.fallback, &already_selected)?;
        pool.extend(fallback);
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{Direction, ExperimentPath};
    use crate::library::{Participant, TrackClassification, TrackMetadata};
    use crate::store::{ExperimentStore, LibraryStore, SqliteStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    // (favorite, confidence, popularity) producing each level.
    const LEVEL_1: (u8, u8, u8) = (1, 1, 90);
    const LEVEL_2: (u8, u8, u8) = (1, 4, 10);
    const LEVEL_3: (u8, u8, u8) = (4, 1, 90);
    const LEVEL_4: (u8, u8, u8) = (4, 1, 10);

    struct Fixture {
        store: SqliteStore,
        session_id: i64,
        _dir: TempDir,
    }

    impl Fixture {
        fn new() -> Fixture {
            let dir = TempDir::new().unwrap();
            let store = SqliteStore::new(dir.path().join("test.db")).unwrap();
            for id in ["alice", "bob"] {
                store
                    .upsert_participant(&Participant {
                        participant_id: id.to_string(),
                        display_name: None,
                    })
                    .unwrap();
            }
            let session = store
                .create_session("alice", "bob", Direction::First, ExperimentPath::A)
                .unwrap();
            Fixture {
                store,
                session_id: session.id,
                _dir: dir,
            }
        }

        fn add_tracks(&self, participant_id: &str, prefix: &str, count: usize, inputs: (u8, u8, u8)) {
            let (favorite, confidence, popularity) = inputs;
            let metadata: Vec<TrackMetadata> = (0..count)
                .map(|i| TrackMetadata {
                    track_id: format!("{}{}", prefix, i),
                    name: format!("{} {}", prefix, i),
                    artist_name: "Artist".to_string(),
                    album_name: "Album".to_string(),
                    image_url: None,
                    popularity: Some(popularity),
                })
                .collect();
            let ids: Vec<String> = metadata.iter().map(|m| m.track_id.clone()).collect();
            self.store
                .upsert_library_tracks(participant_id, metadata)
                .unwrap();
            for id in ids {
                self.store
                    .update_track_classification(
                        &id,
                        participant_id,
                        TrackClassification {
                            favorite_level: Some(favorite),
                            singing_confidence: Some(confidence),
                        },
                    )
                    .unwrap();
            }
        }

        fn request(&self, participant_id: &'static str, phase_number: u32) -> RecommendationRequest<'static> {
            RecommendationRequest {
                session_id: self.session_id,
                participant_id,
                phase_number,
            }
        }
    }

    fn ids(tracks: &[Track]) -> HashSet<String> {
        tracks.iter().map(|t| t.track_id.clone()).collect()
    }

    #[test]
    fn bands_advance_with_phases() {
        assert_eq!(bands_for_phase(1).unwrap().preferred, &[1]);
        assert!(bands_for_phase(2).unwrap().fallback.is_empty());
        assert_eq!(bands_for_phase(4).unwrap().fallback, &[1]);
        assert_eq!(bands_for_phase(6).unwrap().preferred, &[3]);
        assert_eq!(bands_for_phase(7).unwrap().preferred, &[4]);
        assert_eq!(bands_for_phase(8).unwrap().fallback, &[3]);
        assert!(bands_for_phase(0).is_none());
        assert!(bands_for_phase(9).is_none());
    }

    #[test]
    fn unscoped_ranges_advance_with_phases() {
        assert_eq!(unscoped_range_for_phase(2), Some(1..=1));
        assert_eq!(unscoped_range_for_phase(3), Some(1..=2));
        assert_eq!(unscoped_range_for_phase(6), Some(2..=3));
        assert_eq!(unscoped_range_for_phase(8), Some(3..=4));
        assert_eq!(unscoped_range_for_phase(9), None);
    }

    #[test]
    fn fallback_fills_a_short_preferred_pool() {
        let f = Fixture::new();
        f.add_tracks("alice", "pref", 1, LEVEL_2);
        f.add_tracks("alice", "fall", 5, LEVEL_1);

        let pool = RecommendationPolicy::Banded
            .candidate_pool(&f.store, f.request("alice", 3))
            .unwrap();
        assert_eq!(pool.len(), 6);

        let mut rng = StdRng::seed_from_u64(7);
        let picked = RecommendationPolicy::Banded
            .recommend(&f.store, f.request("alice", 3), &mut rng)
            .unwrap();
        assert_eq!(picked.len(), RECOMMENDATION_SIZE);
    }

    #[test]
    fn fallback_not_consulted_when_preferred_is_enough() {
        let f = Fixture::new();
        f.add_tracks("alice", "pref", 3, LEVEL_4);
        f.add_tracks("alice", "fall", 2, LEVEL_3);

        let pool = RecommendationPolicy::Banded
            .candidate_pool(&f.store, f.request("alice", 8))
            .unwrap();
        assert_eq!(pool.len(), 3);
        assert!(pool.iter().all(|t| t.self_disclosure_level == 4));
    }

    #[test]
    fn returns_fewer_when_library_is_small() {
        let f = Fixture::new();
        f.add_tracks("alice", "only", 2, LEVEL_1);

        let mut rng = StdRng::seed_from_u64(1);
        let picked = RecommendationPolicy::Banded
            .recommend(&f.store, f.request("alice", 1), &mut rng)
            .unwrap();
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn banded_excludes_tracks_already_selected_by_participant() {
        let f = Fixture::new();
        f.add_tracks("alice", "t", 4, LEVEL_1);

        let phase = f
            .store
            .create_phase(f.session_id, 1, Direction::First)
            .unwrap();
        f.store.set_phase_selection(phase.id, "t0", "alice").unwrap();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = RecommendationPolicy::Banded
                .recommend(&f.store, f.request("alice", 2), &mut rng)
                .unwrap();
            assert_eq!(picked.len(), 3);
            assert!(!ids(&picked).contains("t0"));
        }
    }

    #[test]
    fn banded_exclusion_is_per_session_and_selector() {
        let f = Fixture::new();
        f.add_tracks("alice", "t", 4, LEVEL_1);
        f.add_tracks("bob", "t", 4, LEVEL_1);

        let own = f
            .store
            .create_phase(f.session_id, 1, Direction::First)
            .unwrap();
        f.store.set_phase_selection(own.id, "t0", "alice").unwrap();
        let partner = f
            .store
            .create_phase(f.session_id, 1, Direction::Second)
            .unwrap();
        f.store.set_phase_selection(partner.id, "t1", "bob").unwrap();

        let earlier = f
            .store
            .create_session("alice", "bob", Direction::First, ExperimentPath::A)
            .unwrap();
        let earlier_phase = f
            .store
            .create_phase(earlier.id, 1, Direction::First)
            .unwrap();
        f.store
            .set_phase_selection(earlier_phase.id, "t2", "alice")
            .unwrap();

        let pool = RecommendationPolicy::Banded
            .candidate_pool(&f.store, f.request("alice", 1))
            .unwrap();
        let expected: HashSet<String> = ["t1", "t2", "t3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&pool), expected);
        assert!(pool.iter().all(|t| t.participant_id == "alice"));

        let bob_pool = RecommendationPolicy::Banded
            .candidate_pool(&f.store, f.request("bob", 1))
            .unwrap();
        let expected: HashSet<String> = ["t0", "t2", "t3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&bob_pool), expected);

        let in_earlier = RecommendationPolicy::Banded
            .candidate_pool(
                &f.store,
                RecommendationRequest {
                    session_id: earlier.id,
                    participant_id: "alice",
                    phase_number: 1,
                },
            )
            .unwrap();
        let expected: HashSet<String> = ["t0", "t1", "t3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&in_earlier), expected);
    }

    #[test]
    fn banded_is_scoped_to_acting_participant_and_skips_level_zero() {
        let f = Fixture::new();
        f.add_tracks("alice", "a", 2, LEVEL_1);
        f.add_tracks("alice", "mute", 2, (4, 0, 90));
        f.add_tracks("bob", "b", 5, LEVEL_1);

        let pool = RecommendationPolicy::Banded
            .candidate_pool(&f.store, f.request("alice", 1))
            .unwrap();
        let expected: HashSet<String> = ["a0", "a1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&pool), expected);
    }

    #[test]
    fn unscoped_spans_participants_without_exclusion() {
        let f = Fixture::new();
        f.add_tracks("alice", "a", 1, LEVEL_1);
        f.add_tracks("bob", "b", 1, LEVEL_2);
        f.add_tracks("bob", "high", 1, LEVEL_4);

        let phase = f
            .store
            .create_phase(f.session_id, 3, Direction::First)
            .unwrap();
        f.store.set_phase_selection(phase.id, "a0", "alice").unwrap();

        let pool = RecommendationPolicy::Unscoped
            .candidate_pool(&f.store, f.request("alice", 3))
            .unwrap();
        let expected: HashSet<String> = ["a0", "b0"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&pool), expected);
    }

    #[test]
    fn no_candidates_outside_experiment_phases() {
        let f = Fixture::new();
        f.add_tracks("alice", "a", 3, LEVEL_1);
        let mut rng = StdRng::seed_from_u64(3);
        for policy in [RecommendationPolicy::Banded, RecommendationPolicy::Unscoped] {
            assert!(policy
                .recommend(&f.store, f.request("alice", 9), &mut rng)
                .unwrap()
                .is_empty());
        }
    }
}
