use super::schema::STORE_VERSIONED_SCHEMAS;
use super::{ExperimentStore, LibraryStore};
use crate::experiment::{Direction, ExperimentPath, Phase, Session};
use crate::library::{Participant, Track, TrackClassification, TrackMetadata};
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{anyhow, Context, Result};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const TRACK_COLUMNS: &str = "track_id, participant_id, name, artist_name, album_name, \
     image_url, favorite_level, singing_confidence, popularity, self_disclosure_level";

const PHASE_COLUMNS: &str =
    "id, session_id, phase_number, selected_track_id, selecting_participant_id, direction";

const SESSION_COLUMNS: &str = "id, participant_a, participant_b, direction, experiment_path";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        track_id: row.get(0)?,
        participant_id: row.get(1)?,
        name: row.get(2)?,
        artist_name: row.get(3)?,
        album_name: row.get(4)?,
        image_url: row.get(5)?,
        favorite_level: row.get(6)?,
        singing_confidence: row.get(7)?,
        popularity: row.get(8)?,
        self_disclosure_level: row.get(9)?,
    })
}

fn phase_from_row(row: &Row) -> rusqlite::Result<Phase> {
    Ok(Phase {
        id: row.get(0)?,
        session_id: row.get(1)?,
        phase_number: row.get(2)?,
        selected_track_id: row.get(3)?,
        selecting_participant_id: row.get(4)?,
        direction: row
            .get::<_, Option<i64>>(5)?
            .map(|value| {
                Direction::from_db(value).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, e.into())
                })
            })
            .transpose()?,
    })
}

fn session_from_row(row: &Row) -> Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        participant_a: row.get(1)?,
        participant_b: row.get(2)?,
        direction: Direction::from_db(row.get(3)?)?,
        path: ExperimentPath::from_db(row.get(4)?)?,
    })
}

fn write_track(conn: &Connection, track: &Track) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO tracks ({TRACK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(track_id, participant_id) DO UPDATE SET \
             name = excluded.name, artist_name = excluded.artist_name, \
             album_name = excluded.album_name, image_url = excluded.image_url, \
             favorite_level = excluded.favorite_level, \
             singing_confidence = excluded.singing_confidence, \
             popularity = excluded.popularity, \
             self_disclosure_level = excluded.self_disclosure_level, \
             updated = cast(strftime('%s','now') as int)"
        ),
        params![
            track.track_id,
            track.participant_id,
            track.name,
            track.artist_name,
            track.album_name,
            track.image_url,
            track.favorite_level,
            track.singing_confidence,
            track.popularity,
            track.self_disclosure_level,
        ],
    )
    .with_context(|| format!("Failed to write track {}", track.track_id))?;
    Ok(())
}

fn read_track(conn: &Connection, track_id: &str, participant_id: &str) -> Result<Option<Track>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {TRACK_COLUMNS} FROM tracks WHERE track_id = ?1 AND participant_id = ?2"
            ),
            params![track_id, participant_id],
            track_from_row,
        )
        .optional()?)
}

fn read_participant_tracks(conn: &Connection, participant_id: &str) -> Result<Vec<Track>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRACK_COLUMNS} FROM tracks WHERE participant_id = ?1 ORDER BY name, track_id"
    ))?;
    let tracks = stmt
        .query_map(params![participant_id], track_from_row)?
        .collect::<rusqlite::Result<Vec<Track>>>()?;
    Ok(tracks)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl SqliteStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, STORE_VERSIONED_SCHEMAS)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Store connection lock poisoned"))
    }
}

impl LibraryStore for SqliteStore {
    fn upsert_participant(&self, participant: &Participant) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (participant_id, display_name) VALUES (?1, ?2) \
             ON CONFLICT(participant_id) DO UPDATE SET display_name = excluded.display_name",
            params![participant.participant_id, participant.display_name],
        )?;
        Ok(())
    }

    fn get_participant(&self, participant_id: &str) -> Result<Option<Participant>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT participant_id, display_name FROM users WHERE participant_id = ?1",
                params![participant_id],
                |row| {
                    Ok(Participant {
                        participant_id: row.get(0)?,
                        display_name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn upsert_library_tracks(
        &self,
        participant_id: &str,
        tracks: Vec<TrackMetadata>,
    ) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        for metadata in tracks {
            let existing = read_track(&tx, &metadata.track_id, participant_id)?;
            let track = metadata.into_track(participant_id, existing.as_ref());
            write_track(&tx, &track)?;
            written += 1;
        }
        tx.commit()?;
        debug!("Upserted {} tracks for {}", written, participant_id);
        Ok(written)
    }

    fn get_track(&self, track_id: &str, participant_id: &str) -> Result<Option<Track>> {
        let conn = self.lock()?;
        read_track(&conn, track_id, participant_id)
    }

    fn get_any_track(&self, track_id: &str) -> Result<Option<Track>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {TRACK_COLUMNS} FROM tracks WHERE track_id = ?1 \
                     ORDER BY participant_id LIMIT 1"
                ),
                params![track_id],
                track_from_row,
            )
            .optional()?)
    }

    fn get_participant_tracks(&self, participant_id: &str) -> Result<Vec<Track>> {
        let conn = self.lock()?;
        read_participant_tracks(&conn, participant_id)
    }

    fn update_track_classification(
        &self,
        track_id: &str,
        participant_id: &str,
        classification: TrackClassification,
    ) -> Result<Option<Track>> {
        let conn = self.lock()?;
        let Some(mut track) = read_track(&conn, track_id, participant_id)? else {
            return Ok(None);
        };
        track.favorite_level = classification.favorite_level;
        track.singing_confidence = classification.singing_confidence;
        track.refresh_disclosure_level();
        write_track(&conn, &track)?;
        Ok(Some(track))
    }

    fn recompute_disclosure_levels(&self, participant_id: &str) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut tracks = read_participant_tracks(&tx, participant_id)?;
        for track in tracks.iter_mut() {
            track.refresh_disclosure_level();
            tx.execute(
                "UPDATE tracks SET self_disclosure_level = ?1 \
                 WHERE track_id = ?2 AND participant_id = ?3",
                params![
                    track.self_disclosure_level,
                    track.track_id,
                    track.participant_id
                ],
            )?;
        }
        tx.commit()?;
        Ok(tracks.len())
    }

    fn get_tracks_by_levels(
        &self,
        participant_id: &str,
        levels: &[u8],
        excluded_track_ids: &[String],
    ) -> Result<Vec<Track>> {
        if levels.is_empty() {
            return Ok(vec![]);
        }

        let mut sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE participant_id = ? \
             AND self_disclosure_level != 0 AND self_disclosure_level IN ({})",
            placeholders(levels.len())
        );
        if !excluded_track_ids.is_empty() {
            sql.push_str(&format!(
                " AND track_id NOT IN ({})",
                placeholders(excluded_track_ids.len())
            ));
        }

        let mut values = vec![Value::Text(participant_id.to_string())];
        values.extend(levels.iter().map(|l| Value::Integer(*l as i64)));
        values.extend(excluded_track_ids.iter().cloned().map(Value::Text));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(params_from_iter(values.iter()), track_from_row)?
            .collect::<rusqlite::Result<Vec<Track>>>()?;
        Ok(tracks)
    }

    fn get_tracks_in_level_range(&self, min: u8, max: u8) -> Result<Vec<Track>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE self_disclosure_level != 0 \
             AND self_disclosure_level BETWEEN ?1 AND ?2"
        ))?;
        let tracks = stmt
            .query_map(params![min, max], track_from_row)?
            .collect::<rusqlite::Result<Vec<Track>>>()?;
        Ok(tracks)
    }
}

impl ExperimentStore for SqliteStore {
    fn create_session(
        &self,
        participant_a: &str,
        participant_b: &str,
        direction: Direction,
        path: ExperimentPath,
    ) -> Result<Session> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (participant_a, participant_b, direction, experiment_path) \
             VALUES (?1, ?2, ?3, ?4)",
            params![participant_a, participant_b, direction.to_db(), path.to_db()],
        )
        .context("Failed to create session")?;
        Ok(Session {
            id: conn.last_insert_rowid(),
            participant_a: participant_a.to_string(),
            participant_b: participant_b.to_string(),
            direction,
            path,
        })
    }

    fn get_session(&self, session_id: i64) -> Result<Option<Session>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![session_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(session_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn create_phase(
        &self,
        session_id: i64,
        phase_number: u32,
        direction: Direction,
    ) -> Result<Phase> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO phases (session_id, phase_number, direction) VALUES (?1, ?2, ?3)",
            params![session_id, phase_number, direction.to_db()],
        )
        .with_context(|| format!("Failed to create phase for session {}", session_id))?;
        Ok(Phase {
            id: conn.last_insert_rowid(),
            session_id,
            phase_number,
            selected_track_id: None,
            selecting_participant_id: None,
            direction: Some(direction),
        })
    }

    fn get_phase(&self, phase_id: i64) -> Result<Option<Phase>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {PHASE_COLUMNS} FROM phases WHERE id = ?1"),
                params![phase_id],
                phase_from_row,
            )
            .optional()?)
    }

    fn get_session_phases(&self, session_id: i64) -> Result<Vec<Phase>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHASE_COLUMNS} FROM phases WHERE session_id = ?1 ORDER BY id"
        ))?;
        let phases = stmt
            .query_map(params![session_id], phase_from_row)?
            .collect::<rusqlite::Result<Vec<Phase>>>()?;
        Ok(phases)
    }

    fn set_phase_selection(
        &self,
        phase_id: i64,
        track_id: &str,
        participant_id: &str,
    ) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE phases SET selected_track_id = ?1, selecting_participant_id = ?2 \
             WHERE id = ?3 AND selected_track_id IS NULL",
            params![track_id, participant_id, phase_id],
        )?;
        Ok(updated == 1)
    }

    fn get_selected_track_ids(
        &self,
        session_id: i64,
        participant_id: &str,
    ) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT selected_track_id FROM phases WHERE session_id = ?1 \
             AND selecting_participant_id = ?2 AND selected_track_id IS NOT NULL ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![session_id, participant_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}
