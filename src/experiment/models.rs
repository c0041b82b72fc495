use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::progression::ProgressionStrategy;
use super::recommendation::RecommendationPolicy;

/// Which participant of a session is the active track selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    First,
    Second,
}

impl Direction {
    pub fn toggle(self) -> Direction {
        match self {
            Direction::First => Direction::Second,
            Direction::Second => Direction::First,
        }
    }

    pub fn to_db(self) -> i64 {
        match self {
            Direction::First => 0,
            Direction::Second => 1,
        }
    }

    pub fn from_db(value: i64) -> Result<Direction> {
        match value {
            0 => Ok(Direction::First),
            1 => Ok(Direction::Second),
            _ => bail!("Invalid direction value {}", value),
        }
    }
}

/// The two parallel experiment flows. Each one pairs a phase progression
/// strategy with a recommendation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentPath {
    A,
    B,
}

impl ExperimentPath {
    pub fn progression(self) -> ProgressionStrategy {
        match self {
            ExperimentPath::A => ProgressionStrategy::FixedToggle,
            ExperimentPath::B => ProgressionStrategy::SessionRelative,
        }
    }

    pub fn recommendation_policy(self) -> RecommendationPolicy {
        match self {
            ExperimentPath::A => RecommendationPolicy::Banded,
            ExperimentPath::B => RecommendationPolicy::Unscoped,
        }
    }

    pub fn to_db(self) -> i64 {
        match self {
            ExperimentPath::A => 0,
            ExperimentPath::B => 1,
        }
    }

    pub fn from_db(value: i64) -> Result<ExperimentPath> {
        match value {
            0 => Ok(ExperimentPath::A),
            1 => Ok(ExperimentPath::B),
            _ => bail!("Invalid experiment path value {}", value),
        }
    }
}

/// Pairs two participants; `direction` says who picks first. Immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub participant_a: String,
    pub participant_b: String,
    pub direction: Direction,
    pub path: ExperimentPath,
}

impl Session {
    pub fn participant_for(&self, direction: Direction) -> &str {
        match direction {
            Direction::First => &self.participant_a,
            Direction::Second => &self.participant_b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: i64,
    pub session_id: i64,
    pub phase_number: u32,
    pub selected_track_id: Option<String>,
    pub selecting_participant_id: Option<String>,
    /// Direction whose participant selects in this row. None for rows
    /// created before it was recorded.
    pub direction: Option<Direction>,
}

/// The state carried between steps by the client, as query parameters or
/// JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub session_id: i64,
    pub phase_id: i64,
    pub phase_number: u32,
    pub direction: Direction,
}
