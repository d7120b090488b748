mod centroid_tracker;
mod matching;
mod rect;
mod track;
mod track_state;

pub use centroid_tracker::{CentroidTracker, TrackerConfig};
pub use matching::{
    AssignmentResult, Detection, MatchStrategy, ObjectClass, assign, centroid_distance,
};
pub use rect::{Rect, iou_batch};
pub use track::{Track, TrackId, TrackedObject};
pub use track_state::TrackState;
