//! Polygon geometry: signed distance, crossing tests and the `Zone` type.

use nalgebra::Point2;

use crate::error::{Result, ZoneError};
use crate::tracker::Rect;

/// Distance from `point` to the nearest edge of the closed `polygon`.
///
/// Positive inside, negative outside, zero on the boundary.
pub fn signed_distance(polygon: &[Point2<f32>], point: &Point2<f32>) -> f32 {
    let n = polygon.len();
    if n == 0 {
        return f32::NEG_INFINITY;
    }

    let mut min_dist = f32::INFINITY;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        min_dist = min_dist.min(point_segment_distance(point, a, b));
    }

    if min_dist == 0.0 {
        0.0
    } else if contains_point(polygon, point) {
        min_dist
    } else {
        -min_dist
    }
}

fn point_segment_distance(p: &Point2<f32>, a: &Point2<f32>, b: &Point2<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return nalgebra::distance(p, a);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    nalgebra::distance(p, &(a + ab * t))
}

/// Even-odd ray casting test. Points exactly on an edge may land on
/// either side; use [`signed_distance`] when the boundary matters.
fn contains_point(polygon: &[Point2<f32>], p: &Point2<f32>) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[inline]
fn ccw(a: &Point2<f32>, b: &Point2<f32>, c: &Point2<f32>) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// True iff segment AB crosses segment CD (orientation test).
pub fn segments_intersect(
    a: &Point2<f32>,
    b: &Point2<f32>,
    c: &Point2<f32>,
    d: &Point2<f32>,
) -> bool {
    ccw(a, c, d) != ccw(b, c, d) && ccw(a, b, c) != ccw(a, b, d)
}

/// True iff the motion `prev -> curr` crosses any edge of `polygon`,
/// the closing edge included. False when either point is unknown.
pub fn crossed_boundary(
    prev: Option<&Point2<f32>>,
    curr: Option<&Point2<f32>>,
    polygon: &[Point2<f32>],
) -> bool {
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return false;
    };
    let n = polygon.len();
    (0..n).any(|i| segments_intersect(prev, curr, &polygon[i], &polygon[(i + 1) % n]))
}

/// Fraction of a `grid x grid` sample of cell centers over `bbox` that
/// lies within `margin` pixels of the polygon.
pub fn box_inside_ratio(polygon: &[Point2<f32>], bbox: &Rect, margin: f32, grid: u32) -> f32 {
    let [x1, y1, x2, y2] = bbox.to_tlbr();
    let x1 = x1.trunc().max(0.0);
    let y1 = y1.trunc().max(0.0);
    let x2 = x2.trunc();
    let y2 = y2.trunc();
    if !(x2 > x1 && y2 > y1) {
        return 0.0;
    }

    let g = grid.max(1);
    let step_x = (x2 - x1) / g as f32;
    let step_y = (y2 - y1) / g as f32;
    let mut inside = 0u32;
    for i in 0..g {
        for j in 0..g {
            let sample = Point2::new(
                x1 + (i as f32 + 0.5) * step_x,
                y1 + (j as f32 + 0.5) * step_y,
            );
            if signed_distance(polygon, &sample) >= -margin {
                inside += 1;
            }
        }
    }
    inside as f32 / (g * g) as f32
}

/// Twice the signed shoelace area (positive for counter-clockwise in a
/// y-up frame).
fn shoelace2(vertices: &[Point2<f32>]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (a, b) = (&vertices[i], &vertices[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// A counting zone: a simple closed polygon in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    vertices: Vec<Point2<f32>>,
}

impl Zone {
    /// Validate and build a zone.
    ///
    /// Repeated consecutive vertices and an explicit closing vertex are
    /// dropped first. Fewer than three distinct vertices, non-finite
    /// coordinates, zero area or crossing edges are rejected.
    pub fn new(vertices: Vec<Point2<f32>>) -> Result<Self> {
        let zone = Self::from_raw(vertices)?;
        if let Some((i, j)) = zone.first_self_intersection() {
            return Err(ZoneError::polygon(format!(
                "edges {} and {} intersect",
                i, j
            )));
        }
        Ok(zone)
    }

    /// Validation without the self-intersection check, for contours
    /// extracted from raster masks which may touch themselves.
    pub(crate) fn from_raw(mut vertices: Vec<Point2<f32>>) -> Result<Self> {
        if let Some(p) = vertices.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(ZoneError::polygon(format!("non-finite vertex {:?}", p)));
        }

        vertices.dedup();
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        if vertices.len() < 3 {
            return Err(ZoneError::polygon(format!(
                "need at least 3 distinct vertices, got {}",
                vertices.len()
            )));
        }
        if shoelace2(&vertices).abs() <= f32::EPSILON {
            return Err(ZoneError::polygon("polygon has zero area"));
        }

        Ok(Self { vertices })
    }

    /// Build a zone from `(x, y)` pixel pairs.
    pub fn from_points(points: &[(f32, f32)]) -> Result<Self> {
        Self::new(points.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    /// Resolve normalized `[0, 1]` coordinates against the frame size.
    /// Pixel coordinates are truncated to whole pixels.
    pub fn from_normalized(coords: &[[f32; 2]], width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ZoneError::polygon(format!(
                "frame size {}x{} is empty",
                width, height
            )));
        }
        let vertices = coords
            .iter()
            .map(|&[nx, ny]| {
                Point2::new(
                    (nx * width as f32).trunc(),
                    (ny * height as f32).trunc(),
                )
            })
            .collect();
        Self::new(vertices)
    }

    /// Validated vertices in pixel coordinates, without a closing vertex.
    pub fn vertices(&self) -> &[Point2<f32>] {
        &self.vertices
    }

    /// Enclosed area in square pixels (shoelace formula).
    pub fn area(&self) -> f32 {
        shoelace2(&self.vertices).abs() / 2.0
    }

    /// Smallest axis-aligned box containing every vertex.
    pub fn bounding_rect(&self) -> Rect {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in &self.vertices {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::from_tlbr(min_x, min_y, max_x, max_y)
    }

    /// Distance to the nearest edge, positive inside and negative outside.
    pub fn signed_distance(&self, point: &Point2<f32>) -> f32 {
        signed_distance(&self.vertices, point)
    }

    /// Membership with a tolerance band of `margin` pixels outside the edge.
    pub fn contains(&self, point: &Point2<f32>, margin: f32) -> bool {
        self.signed_distance(point) >= -margin
    }

    /// True iff the motion from `prev` to `curr` crosses an edge of the
    /// zone. A track without a previous point never crosses.
    pub fn crossed_boundary(&self, prev: Option<&Point2<f32>>, curr: &Point2<f32>) -> bool {
        crossed_boundary(prev, Some(curr), &self.vertices)
    }

    /// Share of `bbox` inside the zone, sampled on a `grid x grid` lattice.
    pub fn box_inside_ratio(&self, bbox: &Rect, margin: f32, grid: u32) -> f32 {
        box_inside_ratio(&self.vertices, bbox, margin, grid)
    }

    fn first_self_intersection(&self) -> Option<(usize, usize)> {
        let n = self.vertices.len();
        let edge = |i: usize| (&self.vertices[i], &self.vertices[(i + 1) % n]);
        for i in 0..n {
            for j in (i + 2)..n {
                // first and last edges share a vertex
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (a, b) = edge(i);
                let (c, d) = edge(j);
                if segments_intersect(a, b, c, d) {
                    return Some((i, j));
                }
            }
        }
        None
    }
}
