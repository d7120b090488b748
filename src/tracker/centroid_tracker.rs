//! Greedy nearest-centroid tracker.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::tracker::matching::{self, AssignmentResult, Detection, MatchStrategy};
use crate::tracker::track::{Track, TrackId, TrackedObject};

/// Configuration for the CentroidTracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Gate on the distance (pixels) between a detection's reference
    /// point and a track's last reference point.
    pub max_distance: f32,
    /// A track is evicted once its miss counter exceeds this.
    pub max_miss: u32,
    pub strategy: MatchStrategy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_distance: 60.0,
            max_miss: 40,
            strategy: MatchStrategy::Sequential,
        }
    }
}

/// Greedy centroid tracker with a distance gate and a miss budget.
///
/// Track ids start at 1 and are never handed out twice by the same
/// instance, not even across [`reset`](Self::reset).
pub struct CentroidTracker {
    tracks: Vec<Track>,
    next_id: TrackId,
    frame_id: u64,
    config: TrackerConfig,
}

impl CentroidTracker {
    /// Create an empty tracker.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
            config,
        }
    }

    /// Configuration the tracker was created with.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames seen since creation or the last reset.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Number of live tracks, coasting ones included.
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Live tracks, in ascending id order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Forget every track. The id counter keeps running so ids handed
    /// out before the reset are never seen again.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.frame_id = 0;
    }

    /// Advance one frame. Must be called for every frame, also when the
    /// detector returned nothing, so that miss counters keep running.
    ///
    /// Returns every live track: matched, newly created and coasting.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        self.frame_id += 1;

        // Step 1: every track starts the frame as missed
        for track in self.tracks.iter_mut() {
            track.mark_missed();
        }

        let detections: Vec<&Detection> = detections
            .iter()
            .filter(|d| {
                let p = d.reference_point();
                let ok = p.x.is_finite() && p.y.is_finite();
                if !ok {
                    warn!(frame = self.frame_id, "skipping detection with non-finite reference point");
                }
                ok
            })
            .collect();

        // Step 2: associate detections with existing tracks
        let track_points: Vec<_> = self.tracks.iter().map(|t| t.reference_point).collect();
        let det_points: Vec<_> = detections.iter().map(|d| d.reference_point()).collect();
        let dists = matching::centroid_distance(&track_points, &det_points);

        let AssignmentResult {
            matches,
            unmatched_detections,
            ..
        } = matching::assign(&dists, self.config.max_distance, self.config.strategy);

        for (itrack, idet) in matches {
            self.tracks[itrack].update(detections[idet], self.frame_id);
        }

        // Step 3: unmatched detections open new tracks
        for idet in unmatched_detections {
            let track = Track::new(self.next_id, detections[idet], self.frame_id);
            debug!(track_id = track.track_id, frame = self.frame_id, "new track");
            self.next_id += 1;
            self.tracks.push(track);
        }

        // Step 4: evict tracks that ran out of misses
        let max_miss = self.config.max_miss;
        let frame_id = self.frame_id;
        self.tracks.retain_mut(|track| {
            if track.misses > max_miss {
                track.mark_removed();
                debug!(
                    track_id = track.track_id,
                    frame = frame_id,
                    age = track.age(frame_id),
                    "track evicted"
                );
                false
            } else {
                true
            }
        });

        self.tracks.iter().map(Track::to_tracked_object).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::track_state::TrackState;

    fn person_at(cx: f32, bottom: f32) -> Detection {
        Detection::person(cx - 10.0, bottom - 40.0, cx + 10.0, bottom, 0.9)
    }

    fn ids(tracks: &[TrackedObject]) -> Vec<TrackId> {
        tracks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_empty_update_never_creates_tracks() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        assert!(tracker.update(&[]).is_empty());
        assert_eq!(tracker.frame_id(), 1);
    }

    #[test]
    fn test_id_persists_within_gate() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        let first = tracker.update(&[person_at(100.0, 100.0)]);
        assert_eq!(ids(&first), vec![1]);

        let second = tracker.update(&[person_at(130.0, 120.0)]);
        assert_eq!(ids(&second), vec![1]);
        assert!(second[0].is_observed());
    }

    #[test]
    fn test_far_detection_opens_new_track() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        tracker.update(&[person_at(100.0, 100.0)]);
        let tracks = tracker.update(&[person_at(200.0, 100.0)]);

        assert_eq!(ids(&tracks), vec![1, 2]);
        assert_eq!(tracks[0].state, TrackState::Lost);
        assert_eq!(tracks[0].misses, 1);
        assert_eq!(tracks[1].state, TrackState::Tracked);
    }

    #[test]
    fn test_gate_is_inclusive() {
        let config = TrackerConfig {
            max_distance: 60.0,
            ..Default::default()
        };
        let mut tracker = CentroidTracker::new(config);
        tracker.update(&[person_at(100.0, 100.0)]);
        let tracks = tracker.update(&[person_at(160.0, 100.0)]);
        assert_eq!(ids(&tracks), vec![1]);
    }

    #[test]
    fn test_eviction_after_max_miss() {
        let config = TrackerConfig {
            max_miss: 3,
            ..Default::default()
        };
        let mut tracker = CentroidTracker::new(config);
        tracker.update(&[person_at(100.0, 100.0)]);

        for _ in 0..3 {
            assert_eq!(tracker.update(&[]).len(), 1);
        }
        // Fourth consecutive miss exceeds max_miss
        assert!(tracker.update(&[]).is_empty());

        let tracks = tracker.update(&[person_at(100.0, 100.0)]);
        assert_eq!(ids(&tracks), vec![2]);
    }

    #[test]
    fn test_non_finite_detection_skipped() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        let bad = Detection::person(f32::NAN, 0.0, 10.0, 10.0, 0.9);
        let tracks = tracker.update(&[bad, person_at(50.0, 50.0)]);
        assert_eq!(ids(&tracks), vec![1]);
    }

    #[test]
    fn test_reset_drops_tracks_keeps_id_counter() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        tracker.update(&[person_at(100.0, 100.0), person_at(300.0, 100.0)]);
        tracker.reset();
        assert_eq!(tracker.num_tracks(), 0);
        assert_eq!(tracker.frame_id(), 0);
        let tracks = tracker.update(&[person_at(100.0, 100.0)]);
        assert_eq!(ids(&tracks), vec![3]);
    }
}
