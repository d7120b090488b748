//! Counting events handed to the event sink.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tracker::TrackId;

pub type StreamId = u32;
pub type AreaId = u32;

/// Direction of a confirmed zone boundary traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Enter,
    Exit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ENTER or EXIT of one track for one (stream, area).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub stream_id: StreamId,
    pub area_id: AreaId,
    pub track_id: TrackId,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

/// Live occupancy of one (stream, area) at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub stream_id: StreamId,
    pub area_id: AreaId,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}
