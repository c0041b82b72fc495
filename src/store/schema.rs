use crate::sqlite_column;
use rusqlite::Connection;
use crate::sqlite_persistence::{
    ForeignKey, OnDelete, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const USERS_TABLE_V_0: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("participant_id", SqlType::Text, is_primary_key = true),
        sqlite_column!("display_name", SqlType::Text),
        sqlite_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const TRACK_OWNER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "participant_id",
    on_delete: OnDelete::Cascade,
};

const TRACKS_TABLE_V_0: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("track_id", SqlType::Text, non_null = true),
        sqlite_column!(
            "participant_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_OWNER_FK)
        ),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!("artist_name", SqlType::Text, non_null = true),
        sqlite_column!("album_name", SqlType::Text, non_null = true),
        sqlite_column!("image_url", SqlType::Text),
        sqlite_column!("favorite_level", SqlType::Integer),
        sqlite_column!("singing_confidence", SqlType::Integer),
        sqlite_column!("popularity", SqlType::Integer),
        sqlite_column!(
            "self_disclosure_level",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_tracks_participant", "participant_id"),
        ("idx_tracks_level", "self_disclosure_level"),
    ],
    unique_constraints: &[&["track_id", "participant_id"]],
};

const SESSION_PARTICIPANT_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "participant_id",
    on_delete: OnDelete::Restrict,
};

const SESSIONS_TABLE_V_0: Table = Table {
    name: "sessions",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "participant_a",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&SESSION_PARTICIPANT_FK)
        ),
        sqlite_column!(
            "participant_b",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&SESSION_PARTICIPANT_FK)
        ),
        sqlite_column!("direction", SqlType::Integer, non_null = true),
        sqlite_column!("experiment_path", SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const PHASE_SESSION_FK: ForeignKey = ForeignKey {
    foreign_table: "sessions",
    foreign_column: "id",
    on_delete: OnDelete::Cascade,
};

const PHASES_TABLE_V_0: Table = Table {
    name: "phases",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "session_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PHASE_SESSION_FK)
        ),
        sqlite_column!("phase_number", SqlType::Integer, non_null = true),
        sqlite_column!("selected_track_id", SqlType::Text),
        sqlite_column!("selecting_participant_id", SqlType::Text),
        sqlite_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_phases_session", "session_id")],
    unique_constraints: &[],
};

/// Adds the direction each phase row was opened for. Rows written before this
/// version keep a NULL direction.
const PHASES_TABLE_V_1: Table = Table {
    name: "phases",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "session_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PHASE_SESSION_FK)
        ),
        sqlite_column!("phase_number", SqlType::Integer, non_null = true),
        sqlite_column!("selected_track_id", SqlType::Text),
        sqlite_column!("selecting_participant_id", SqlType::Text),
        sqlite_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("direction", SqlType::Integer),
    ],
    indices: &[("idx_phases_session", "session_id")],
    unique_constraints: &[],
};

pub const STORE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USERS_TABLE_V_0,
            TRACKS_TABLE_V_0,
            SESSIONS_TABLE_V_0,
            PHASES_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USERS_TABLE_V_0,
            TRACKS_TABLE_V_0,
            SESSIONS_TABLE_V_0,
            PHASES_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute("ALTER TABLE phases ADD COLUMN direction INTEGER", [])?;
            Ok(())
        }),
    },
];
