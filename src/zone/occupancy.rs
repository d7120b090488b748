//! Per-track zone membership with crossing confirmation.
//!
//! Each observed track is evaluated once per frame against the zone.
//! A change of membership only turns into an ENTER or EXIT when it is
//! backed by evidence of a real boundary traversal:
//!
//! - the motion segment since the previous frame crosses an edge, or
//! - the membership flipped and either the signed distance changed sign
//!   or one of the two points lies within `cross_margin_px` of an edge.
//!
//! Jitter around the boundary therefore flips `inside` without
//! producing events, and every track id yields at most one ENTER and at
//! most one EXIT under [`DedupPolicy::OncePerTrack`].

use std::collections::{HashMap, HashSet};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event::Direction;
use crate::tracker::{TrackId, TrackedObject};
use crate::zone::polygon::Zone;

/// Which signal decides whether a track is inside the zone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MembershipSignal {
    /// Reference point within `margin_px` of the zone.
    #[default]
    ReferencePoint,
    /// Share of the bounding box inside the zone, with separate
    /// thresholds for becoming inside and for staying inside.
    BoxRatio {
        enter_ratio: f32,
        exit_ratio: f32,
        grid: u32,
    },
}

impl MembershipSignal {
    pub fn box_ratio() -> Self {
        Self::BoxRatio {
            enter_ratio: 0.6,
            exit_ratio: 0.4,
            grid: 4,
        }
    }
}

/// What it takes for a membership change to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfirmPolicy {
    /// Geometric or proximity evidence of a boundary crossing.
    #[default]
    Crossing,
    /// The new membership must hold for `frames` consecutive observations.
    Streak { frames: u32 },
}

/// How often a single track id may be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// At most one ENTER and one EXIT per track id, ever.
    #[default]
    OncePerTrack,
    /// A confirmed EXIT re-arms ENTER and vice versa, so a track that
    /// leaves and comes back is counted again.
    PerCycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Tolerance band outside the edge that still counts as inside.
    pub margin_px: f32,
    /// Distance to an edge that corroborates a membership flip.
    pub cross_margin_px: f32,
    pub membership: MembershipSignal,
    pub confirm: ConfirmPolicy,
    pub dedup: DedupPolicy,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            margin_px: 5.0,
            cross_margin_px: 8.0,
            membership: MembershipSignal::default(),
            confirm: ConfirmPolicy::default(),
            dedup: DedupPolicy::default(),
        }
    }
}

/// Zone state of one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyRecord {
    pub inside: bool,
    pub prev_point: Option<Point2<f32>>,
    pub enter_streak: u32,
    pub exit_streak: u32,
}

/// A confirmed traversal, before it is stamped with stream and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub track_id: TrackId,
    pub direction: Direction,
}

/// Occupancy state machine for one zone.
pub struct ZoneOccupancy {
    zone: Zone,
    config: OccupancyConfig,
    records: HashMap<TrackId, OccupancyRecord>,
    entered: HashSet<TrackId>,
    exited: HashSet<TrackId>,
    inside_ids: HashSet<TrackId>,
}

impl ZoneOccupancy {
    pub fn new(zone: Zone, config: OccupancyConfig) -> Self {
        Self {
            zone,
            config,
            records: HashMap::new(),
            entered: HashSet::new(),
            exited: HashSet::new(),
            inside_ids: HashSet::new(),
        }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn config(&self) -> &OccupancyConfig {
        &self.config
    }

    /// Live occupancy as of the last [`update`](Self::update).
    pub fn occupancy(&self) -> usize {
        self.inside_ids.len()
    }

    /// Ids currently counted inside the zone.
    pub fn inside_ids(&self) -> &HashSet<TrackId> {
        &self.inside_ids
    }

    /// Zone state of one track, if it is still live.
    pub fn record(&self, track_id: TrackId) -> Option<&OccupancyRecord> {
        self.records.get(&track_id)
    }

    /// True once an ENTER was emitted for this id in the current cycle.
    pub fn has_entered(&self, track_id: TrackId) -> bool {
        self.entered.contains(&track_id)
    }

    pub fn has_exited(&self, track_id: TrackId) -> bool {
        self.exited.contains(&track_id)
    }

    /// Drop every record, e.g. after a discontinuity in the stream.
    pub fn reset(&mut self) {
        self.records.clear();
        self.entered.clear();
        self.exited.clear();
        self.inside_ids.clear();
    }

    /// Evaluate one frame.
    ///
    /// `tracks` must be the full set of live tracks. Tracks matched this
    /// frame are evaluated, coasting tracks keep their record as is, and
    /// state of ids missing from `tracks` is purged.
    pub fn update(&mut self, tracks: &[TrackedObject]) -> Vec<Transition> {
        let mut transitions = Vec::new();

        for track in tracks.iter().filter(|t| t.is_observed()) {
            if let Some(transition) = self.evaluate(track) {
                transitions.push(transition);
            }
        }

        // Housekeeping
        let active: HashSet<TrackId> = tracks.iter().map(|t| t.id).collect();
        self.records.retain(|id, _| active.contains(id));
        self.entered.retain(|id| active.contains(id));
        self.exited.retain(|id| active.contains(id));

        self.inside_ids = self
            .records
            .iter()
            .filter(|(_, record)| record.inside)
            .map(|(&id, _)| id)
            .collect();

        transitions
    }

    fn membership(&self, track: &TrackedObject, prev_inside: bool) -> bool {
        match self.config.membership {
            MembershipSignal::ReferencePoint => {
                self.zone.contains(&track.reference_point, self.config.margin_px)
            }
            MembershipSignal::BoxRatio {
                enter_ratio,
                exit_ratio,
                grid,
            } => {
                let ratio = self
                    .zone
                    .box_inside_ratio(&track.bbox, self.config.margin_px, grid);
                if prev_inside {
                    ratio >= exit_ratio
                } else {
                    ratio >= enter_ratio
                }
            }
        }
    }

    fn evaluate(&mut self, track: &TrackedObject) -> Option<Transition> {
        let id = track.id;
        let curr = track.reference_point;
        let known = self.records.contains_key(&id);
        let record = self.records.get(&id).cloned().unwrap_or_default();
        let prev_inside = record.inside;
        let is_inside = self.membership(track, prev_inside);

        let (next, direction) = match self.config.confirm {
            ConfirmPolicy::Crossing => self.confirm_by_crossing(id, record, curr, is_inside),
            ConfirmPolicy::Streak { frames } => {
                confirm_by_streak(record, curr, is_inside, known, frames)
            }
        };
        self.records.insert(id, next);

        let direction = direction?;
        let allowed = match direction {
            Direction::Enter => !self.entered.contains(&id),
            Direction::Exit => !self.exited.contains(&id),
        };
        if !allowed {
            return None;
        }

        match (direction, self.config.dedup) {
            (Direction::Enter, DedupPolicy::OncePerTrack) => {
                self.entered.insert(id);
            }
            (Direction::Exit, DedupPolicy::OncePerTrack) => {
                self.exited.insert(id);
            }
            (Direction::Enter, DedupPolicy::PerCycle) => {
                self.entered.insert(id);
                self.exited.remove(&id);
            }
            (Direction::Exit, DedupPolicy::PerCycle) => {
                self.exited.insert(id);
                self.entered.remove(&id);
            }
        }

        Some(Transition {
            track_id: id,
            direction,
        })
    }

    fn confirm_by_crossing(
        &self,
        id: TrackId,
        record: OccupancyRecord,
        curr: Point2<f32>,
        is_inside: bool,
    ) -> (OccupancyRecord, Option<Direction>) {
        let prev_inside = record.inside;
        let curr_dist = self.zone.signed_distance(&curr);
        let prev_dist = record.prev_point.map(|p| self.zone.signed_distance(&p));

        let state_changed = prev_inside != is_inside;
        let seg_crossed = self.zone.crossed_boundary(record.prev_point.as_ref(), &curr);
        let (sign_flip, near_edge) = match prev_dist {
            Some(prev) => (
                (prev <= 0.0 && curr_dist > 0.0) || (prev >= 0.0 && curr_dist < 0.0),
                prev.abs() <= self.config.cross_margin_px
                    || curr_dist.abs() <= self.config.cross_margin_px,
            ),
            None => (false, false),
        };
        let confirmed = seg_crossed || (state_changed && (sign_flip || near_edge));

        if seg_crossed || state_changed {
            trace!(
                track_id = id,
                prev = ?record.prev_point,
                curr = ?curr,
                prev_dist = ?prev_dist,
                curr_dist,
                prev_inside,
                is_inside,
                seg_crossed,
                sign_flip,
                near_edge,
                confirmed,
                "crossing check"
            );
        }

        let direction = match (prev_inside, is_inside, confirmed) {
            (false, true, true) => Some(Direction::Enter),
            (true, false, true) => Some(Direction::Exit),
            _ => None,
        };

        let next = OccupancyRecord {
            inside: is_inside,
            prev_point: Some(curr),
            enter_streak: 0,
            exit_streak: 0,
        };
        (next, direction)
    }
}

/// Streak debounce: the first observation sets the state silently, later
/// flips need `frames` consecutive agreeing observations.
fn confirm_by_streak(
    mut record: OccupancyRecord,
    curr: Point2<f32>,
    is_inside: bool,
    known: bool,
    frames: u32,
) -> (OccupancyRecord, Option<Direction>) {
    record.prev_point = Some(curr);

    if !known {
        record.inside = is_inside;
        return (record, None);
    }

    if is_inside == record.inside {
        record.enter_streak = 0;
        record.exit_streak = 0;
        return (record, None);
    }

    let streak = if is_inside {
        record.exit_streak = 0;
        record.enter_streak += 1;
        record.enter_streak
    } else {
        record.enter_streak = 0;
        record.exit_streak += 1;
        record.exit_streak
    };

    if streak < frames.max(1) {
        return (record, None);
    }

    record.inside = is_inside;
    record.enter_streak = 0;
    record.exit_streak = 0;
    let direction = if is_inside {
        Direction::Enter
    } else {
        Direction::Exit
    };
    (record, Some(direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{Rect, TrackState};

    fn square() -> Zone {
        Zone::from_points(&[(100.0, 100.0), (300.0, 100.0), (300.0, 300.0), (100.0, 300.0)])
            .unwrap()
    }

    /// A 20x40 box standing on `(x, y)`.
    fn observed(id: TrackId, x: f32, y: f32) -> TrackedObject {
        TrackedObject {
            id,
            bbox: Rect::from_tlbr(x - 10.0, y - 40.0, x + 10.0, y),
            reference_point: Point2::new(x, y),
            misses: 0,
            state: TrackState::Tracked,
        }
    }

    fn coasting(id: TrackId, x: f32, y: f32) -> TrackedObject {
        TrackedObject {
            misses: 1,
            state: TrackState::Lost,
            ..observed(id, x, y)
        }
    }

    #[test]
    fn test_enter_on_segment_crossing() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        assert!(occ.update(&[observed(1, 50.0, 50.0)]).is_empty());
        let transitions = occ.update(&[observed(1, 150.0, 150.0)]);
        assert_eq!(
            transitions,
            vec![Transition {
                track_id: 1,
                direction: Direction::Enter
            }]
        );
        assert_eq!(occ.occupancy(), 1);
        assert!(occ.has_entered(1));
    }

    #[test]
    fn test_first_observation_inside_is_silent() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        assert!(occ.update(&[observed(1, 200.0, 200.0)]).is_empty());
        assert_eq!(occ.occupancy(), 1);
        assert!(!occ.has_entered(1));
    }

    #[test]
    fn test_exit_after_enter() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        occ.update(&[observed(1, 50.0, 200.0)]);
        occ.update(&[observed(1, 150.0, 200.0)]);
        let transitions = occ.update(&[observed(1, 350.0, 200.0)]);
        assert_eq!(transitions[0].direction, Direction::Exit);
        assert_eq!(occ.occupancy(), 0);
    }

    #[test]
    fn test_once_per_track_blocks_reentry() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        let path = [50.0, 150.0, 350.0, 250.0, 350.0];
        let directions: Vec<_> = path
            .iter()
            .flat_map(|&x| occ.update(&[observed(1, x, 200.0)]))
            .map(|t| t.direction)
            .collect();
        assert_eq!(directions, vec![Direction::Enter, Direction::Exit]);
    }

    #[test]
    fn test_per_cycle_counts_reentry() {
        let config = OccupancyConfig {
            dedup: DedupPolicy::PerCycle,
            ..Default::default()
        };
        let mut occ = ZoneOccupancy::new(square(), config);
        let path = [50.0, 150.0, 350.0, 250.0, 350.0];
        let directions: Vec<_> = path
            .iter()
            .flat_map(|&x| occ.update(&[observed(1, x, 200.0)]))
            .map(|t| t.direction)
            .collect();
        assert_eq!(
            directions,
            vec![
                Direction::Enter,
                Direction::Exit,
                Direction::Enter,
                Direction::Exit
            ]
        );
    }

    /// Alternate between 10px and 4px above the top edge. With a 5px
    /// band the second position counts as inside, so membership flips
    /// every frame without the point ever reaching the edge.
    fn flip_above_edge(cross_margin_px: f32) -> (Vec<Direction>, Vec<bool>) {
        let config = OccupancyConfig {
            margin_px: 5.0,
            cross_margin_px,
            ..Default::default()
        };
        let mut occ = ZoneOccupancy::new(square(), config);
        let mut directions = Vec::new();
        let mut inside = Vec::new();
        for frame in 0..20 {
            let y = if frame % 2 == 0 { 90.0 } else { 96.0 };
            directions.extend(occ.update(&[observed(1, 200.0, y)]).iter().map(|t| t.direction));
            inside.push(occ.record(1).map(|r| r.inside).unwrap_or(false));
        }
        (directions, inside)
    }

    #[test]
    fn test_flip_far_from_edge_is_not_confirmed() {
        let (directions, inside) = flip_above_edge(1.0);
        assert!(directions.is_empty());
        let expected: Vec<bool> = (0..20).map(|frame| frame % 2 == 1).collect();
        assert_eq!(inside, expected);
    }

    #[test]
    fn test_flip_near_edge_is_confirmed_once() {
        let (directions, inside) = flip_above_edge(8.0);
        assert_eq!(directions, vec![Direction::Enter, Direction::Exit]);
        assert!(inside[1] && !inside[2]);
    }

    #[test]
    fn test_margin_band_counts_as_inside() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        // 4px outside the top edge, inside the 5px tolerance band
        occ.update(&[observed(1, 200.0, 96.0)]);
        assert_eq!(occ.occupancy(), 1);
    }

    #[test]
    fn test_housekeeping_purges_missing_ids() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        occ.update(&[observed(1, 200.0, 200.0), observed(2, 150.0, 150.0)]);
        assert_eq!(occ.occupancy(), 2);

        occ.update(&[observed(2, 150.0, 150.0)]);
        assert_eq!(occ.occupancy(), 1);
        assert!(occ.record(1).is_none());
        assert!(occ.inside_ids().contains(&2));
    }

    #[test]
    fn test_coasting_track_keeps_state() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        occ.update(&[observed(1, 50.0, 50.0)]);
        occ.update(&[observed(1, 150.0, 150.0)]);

        let transitions = occ.update(&[coasting(1, 150.0, 150.0)]);
        assert!(transitions.is_empty());
        assert_eq!(occ.occupancy(), 1);
        assert_eq!(occ.record(1).unwrap().prev_point, Some(Point2::new(150.0, 150.0)));
    }

    #[test]
    fn test_box_ratio_hysteresis() {
        let config = OccupancyConfig {
            margin_px: 0.0,
            membership: MembershipSignal::box_ratio(),
            ..Default::default()
        };
        let mut occ = ZoneOccupancy::new(square(), config);

        // Box x in [90, 110]: half inside, below the 0.6 enter ratio.
        occ.update(&[observed(1, 100.0, 200.0)]);
        assert_eq!(occ.occupancy(), 0);

        // Box x in [120, 140]: fully inside, enters.
        occ.update(&[observed(1, 130.0, 200.0)]);
        assert_eq!(occ.occupancy(), 1);

        // Back to half inside: still above the 0.4 exit ratio.
        occ.update(&[observed(1, 100.0, 200.0)]);
        assert_eq!(occ.occupancy(), 1);
    }

    #[test]
    fn test_streak_policy_needs_consecutive_frames() {
        let config = OccupancyConfig {
            confirm: ConfirmPolicy::Streak { frames: 3 },
            ..Default::default()
        };
        let mut occ = ZoneOccupancy::new(square(), config);
        occ.update(&[observed(1, 50.0, 200.0)]);

        // Two inside frames, then a relapse: no event.
        assert!(occ.update(&[observed(1, 150.0, 200.0)]).is_empty());
        assert!(occ.update(&[observed(1, 150.0, 200.0)]).is_empty());
        assert!(occ.update(&[observed(1, 50.0, 200.0)]).is_empty());
        assert_eq!(occ.occupancy(), 0);

        assert!(occ.update(&[observed(1, 150.0, 200.0)]).is_empty());
        assert!(occ.update(&[observed(1, 150.0, 200.0)]).is_empty());
        let transitions = occ.update(&[observed(1, 150.0, 200.0)]);
        assert_eq!(transitions[0].direction, Direction::Enter);
        assert_eq!(occ.occupancy(), 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut occ = ZoneOccupancy::new(square(), OccupancyConfig::default());
        occ.update(&[observed(1, 50.0, 50.0)]);
        occ.update(&[observed(1, 150.0, 150.0)]);
        occ.reset();
        assert_eq!(occ.occupancy(), 0);
        assert!(occ.record(1).is_none());
        assert!(!occ.has_entered(1));
    }
}
