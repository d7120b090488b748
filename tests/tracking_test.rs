use std::collections::HashSet;

use zonecount_rs::{CentroidTracker, Detection, MatchStrategy, TrackId, TrackerConfig};

/// Person whose bottom-center reference point is (x, y).
fn person_at(x: f32, y: f32) -> Detection {
    Detection::person(x - 10.0, y - 40.0, x + 10.0, y, 0.9)
}

#[test]
fn test_basic_tracking() {
    let mut tracker = CentroidTracker::new(TrackerConfig::default());

    // Frame 1: one detection opens track 1
    let tracks1 = tracker.update(&[person_at(100.0, 200.0)]);
    assert_eq!(tracks1.len(), 1);
    let id1 = tracks1[0].id;
    assert_eq!(id1, 1);

    // Frame 2: small motion keeps the id
    let tracks2 = tracker.update(&[person_at(110.0, 205.0)]);
    assert_eq!(tracks2.len(), 1);
    assert_eq!(tracks2[0].id, id1);

    // Frame 3: occluded, the track coasts
    let tracks3 = tracker.update(&[]);
    assert_eq!(tracks3.len(), 1);
    assert_eq!(tracks3[0].misses, 1);
    assert!(!tracks3[0].is_observed());

    // Frame 4: reappears near the last known position
    let tracks4 = tracker.update(&[person_at(115.0, 210.0)]);
    assert_eq!(tracks4.len(), 1);
    assert_eq!(tracks4[0].id, id1);
    assert!(tracks4[0].is_observed());
}

#[test]
fn test_distance_gate() {
    let config = TrackerConfig {
        max_distance: 50.0,
        ..Default::default()
    };
    let mut tracker = CentroidTracker::new(config);
    tracker.update(&[person_at(100.0, 100.0), person_at(400.0, 100.0)]);

    // One detection within the gate of track 1 only, one beyond every gate
    let tracks = tracker.update(&[person_at(130.0, 120.0), person_at(250.0, 300.0)]);
    let observed: Vec<TrackId> = tracks
        .iter()
        .filter(|t| t.is_observed())
        .map(|t| t.id)
        .collect();
    assert_eq!(observed, vec![1, 3]);
    assert_eq!(tracks.iter().find(|t| t.id == 2).map(|t| t.misses), Some(1));
}

#[test]
fn test_eviction_never_reuses_ids() {
    let config = TrackerConfig {
        max_miss: 5,
        ..Default::default()
    };
    let mut tracker = CentroidTracker::new(config);
    tracker.update(&[person_at(100.0, 100.0)]);

    // max_miss misses keep the track alive, one more evicts it
    for _ in 0..5 {
        assert_eq!(tracker.update(&[]).len(), 1);
    }
    assert!(tracker.update(&[]).is_empty());

    // Same place, new identity
    let tracks = tracker.update(&[person_at(100.0, 100.0)]);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id, 2);
}

#[test]
fn test_ids_unique_over_long_sequence() {
    let mut tracker = CentroidTracker::new(TrackerConfig {
        max_miss: 2,
        ..Default::default()
    });
    let mut seen: HashSet<TrackId> = HashSet::new();
    let mut last_max = 0;

    // A new subject every 10 frames, far from the previous one
    for frame in 0..100u32 {
        let subject = frame / 10;
        let x = 50.0 + 200.0 * (subject % 5) as f32;
        let y = 100.0 + 200.0 * (subject / 5) as f32;
        let dets = if frame % 10 < 6 { vec![person_at(x, y)] } else { vec![] };
        for track in tracker.update(&dets) {
            if seen.insert(track.id) {
                assert!(track.id > last_max);
                last_max = track.id;
            }
        }
    }
    assert_eq!(seen.len(), 10);
}

#[test]
fn test_strategies_agree_on_separated_subjects() {
    for strategy in [
        MatchStrategy::Sequential,
        MatchStrategy::GlobalNearest,
        MatchStrategy::Optimal,
    ] {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            strategy,
            ..Default::default()
        });
        tracker.update(&[person_at(100.0, 100.0), person_at(300.0, 100.0)]);
        let tracks = tracker.update(&[person_at(305.0, 110.0), person_at(95.0, 105.0)]);

        let by_id: Vec<(TrackId, f32)> = tracks.iter().map(|t| (t.id, t.reference_point.x)).collect();
        assert_eq!(by_id, vec![(1, 95.0), (2, 305.0)], "{:?}", strategy);
    }
}
