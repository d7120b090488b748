//! Single centroid track.

use nalgebra::Point2;

use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Track identifiers are allocated per tracker instance, starting at 1.
pub type TrackId = u64;

/// Persistent identity owned by the tracker.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique track identifier, never reused within one tracker
    pub track_id: TrackId,
    pub state: TrackState,
    /// Last matched bounding box
    pub bbox: Rect,
    /// Bottom-center of the last matched bounding box
    pub reference_point: Point2<f32>,
    /// Detection confidence of the last match
    pub score: f32,
    /// Consecutive frames without a matching detection
    pub misses: u32,
    /// Frame index when the track was created
    pub start_frame: u64,
    /// Frame index of the last match
    pub frame_id: u64,
}

impl Track {
    /// Seed a new track from an unmatched detection.
    pub fn new(track_id: TrackId, det: &Detection, frame_id: u64) -> Self {
        Self {
            track_id,
            state: TrackState::Tracked,
            bbox: det.bbox,
            reference_point: det.reference_point(),
            score: det.score,
            misses: 0,
            start_frame: frame_id,
            frame_id,
        }
    }

    /// Bind a detection to this track.
    pub fn update(&mut self, det: &Detection, frame_id: u64) {
        self.bbox = det.bbox;
        self.reference_point = det.reference_point();
        self.score = det.score;
        self.misses = 0;
        self.frame_id = frame_id;
        self.state = TrackState::Tracked;
    }

    pub fn mark_missed(&mut self) {
        self.misses += 1;
        self.state = TrackState::Lost;
    }

    pub fn mark_removed(&mut self) {
        self.state = TrackState::Removed;
    }

    /// Number of frames since creation.
    pub fn age(&self, current_frame: u64) -> u64 {
        current_frame.saturating_sub(self.start_frame)
    }

    pub fn to_tracked_object(&self) -> TrackedObject {
        TrackedObject {
            id: self.track_id,
            bbox: self.bbox,
            reference_point: self.reference_point,
            misses: self.misses,
            state: self.state,
        }
    }
}

/// Snapshot of a live track handed out by [`CentroidTracker::update`].
///
/// [`CentroidTracker::update`]: crate::tracker::CentroidTracker::update
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: TrackId,
    pub bbox: Rect,
    pub reference_point: Point2<f32>,
    pub misses: u32,
    pub state: TrackState,
}

impl TrackedObject {
    /// True when a detection was bound to this track in the current frame.
    #[inline]
    pub fn is_observed(&self) -> bool {
        self.misses == 0
    }
}
