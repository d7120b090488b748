//! Matching utilities for the centroid tracker.

use nalgebra::Point2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::rect::Rect;

/// Object class reported by the detector.
///
/// Only the classes the counter reasons about get their own variant,
/// everything else is carried through as its raw class id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Person,
    Bicycle,
    Motorcycle,
    Other(u32),
}

impl ObjectClass {
    /// Map a COCO class id (0 = person, 1 = bicycle, 3 = motorcycle).
    pub fn from_coco_id(id: u32) -> Self {
        match id {
            0 => Self::Person,
            1 => Self::Bicycle,
            3 => Self::Motorcycle,
            other => Self::Other(other),
        }
    }

    /// Vehicles whose overlap marks a person detection as a rider.
    pub fn is_rider_vehicle(&self) -> bool {
        matches!(self, Self::Bicycle | Self::Motorcycle)
    }
}

/// Detection input for the tracker.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding box (built from x1, y1, x2, y2)
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
    pub class: ObjectClass,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class: ObjectClass) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            class,
        }
    }

    /// Shorthand for a person detection, the class that gets counted.
    pub fn person(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self::new(x1, y1, x2, y2, score, ObjectClass::Person)
    }

    pub fn from_rect(bbox: Rect, score: f32, class: ObjectClass) -> Self {
        Self { bbox, score, class }
    }

    /// Ground-contact point used for tracking and zone membership.
    #[inline]
    pub fn reference_point(&self) -> Point2<f32> {
        self.bbox.bottom_center()
    }
}

/// How detections are paired with existing tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Detections in input order each claim their nearest free track.
    #[default]
    Sequential,
    /// Repeatedly bind the closest remaining (track, detection) pair.
    GlobalNearest,
    /// Minimum total distance assignment (Jonker-Volgenant).
    Optimal,
}

/// Euclidean distance matrix of shape (tracks, detections).
pub fn centroid_distance(track_points: &[Point2<f32>], det_points: &[Point2<f32>]) -> Array2<f32> {
    let mut dists = Array2::zeros((track_points.len(), det_points.len()));
    for (i, t) in track_points.iter().enumerate() {
        for (j, d) in det_points.iter().enumerate() {
            dists[[i, j]] = nalgebra::distance(t, d);
        }
    }
    dists
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    /// (track row, detection column) pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    /// Always in ascending column order, which is detection input order.
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn from_matches(matches: Vec<(usize, usize)>, num_rows: usize, num_cols: usize) -> Self {
        let mut row_used = vec![false; num_rows];
        let mut col_used = vec![false; num_cols];
        for &(i, j) in &matches {
            row_used[i] = true;
            col_used[j] = true;
        }
        Self {
            matches,
            unmatched_tracks: (0..num_rows).filter(|&i| !row_used[i]).collect(),
            unmatched_detections: (0..num_cols).filter(|&j| !col_used[j]).collect(),
        }
    }
}

/// Dispatch to the assignment routine for `strategy`.
pub fn assign(dists: &Array2<f32>, max_distance: f32, strategy: MatchStrategy) -> AssignmentResult {
    match strategy {
        MatchStrategy::Sequential => sequential_assignment(dists, max_distance),
        MatchStrategy::GlobalNearest => global_nearest_assignment(dists, max_distance),
        MatchStrategy::Optimal => optimal_assignment(dists, max_distance),
    }
}

/// Each detection, in input order, takes the nearest track not yet
/// claimed. Ties go to the lower track row.
pub fn sequential_assignment(dists: &Array2<f32>, max_distance: f32) -> AssignmentResult {
    let (num_rows, num_cols) = dists.dim();
    let mut claimed = vec![false; num_rows];
    let mut matches = Vec::new();

    for j in 0..num_cols {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..num_rows {
            if claimed[i] {
                continue;
            }
            let d = dists[[i, j]];
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }

        match best {
            Some((i, d)) if d <= max_distance => {
                claimed[i] = true;
                matches.push((i, j));
            }
            _ => {}
        }
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

/// Bind the globally closest pair, strike its row and column, repeat
/// until the closest remaining pair is beyond the gate.
pub fn global_nearest_assignment(dists: &Array2<f32>, max_distance: f32) -> AssignmentResult {
    let (num_rows, num_cols) = dists.dim();
    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::new();

    for _ in 0..num_rows.min(num_cols) {
        let mut best: Option<(usize, usize, f32)> = None;
        for i in (0..num_rows).filter(|&i| !row_used[i]) {
            for j in (0..num_cols).filter(|&j| !col_used[j]) {
                let d = dists[[i, j]];
                if best.is_none_or(|(_, _, best_d)| d < best_d) {
                    best = Some((i, j, d));
                }
            }
        }

        match best {
            Some((i, j, d)) if d <= max_distance => {
                row_used[i] = true;
                col_used[j] = true;
                matches.push((i, j));
            }
            _ => break,
        }
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

/// Minimum-cost assignment with gated pairs priced out of reach.
pub fn optimal_assignment(dists: &Array2<f32>, max_distance: f32) -> AssignmentResult {
    const UNREACHABLE: f64 = 1e6;

    let (num_rows, num_cols) = dists.dim();
    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::from_matches(Vec::new(), num_rows, num_cols);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), UNREACHABLE);
    for i in 0..num_rows {
        for j in 0..num_cols {
            let d = dists[[i, j]];
            if d <= max_distance {
                padded[[i, j]] = d as f64;
            }
        }
    }

    let mut matches = Vec::new();
    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && dists[[row_idx, col_idx]] <= max_distance {
                    matches.push((row_idx, col_idx));
                }
            }
        }
        Err(_) => {
            tracing::warn!("optimal assignment failed, falling back to sequential matching");
            return sequential_assignment(dists, max_distance);
        }
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}
