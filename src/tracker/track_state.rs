/// Lifecycle of a centroid track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Matched (or created) by a detection in the current frame
    #[default]
    Tracked,
    /// Unmatched this frame, coasting on its miss budget
    Lost,
    /// Miss budget exhausted; the id is retired
    Removed,
}
