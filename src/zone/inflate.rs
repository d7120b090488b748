//! Outward inflation of a zone by a fixed pixel margin.
//!
//! The polygon is rasterized into a frame-sized mask, dilated with a
//! disc-shaped structuring element and traced back into a polygon. This
//! runs once per session, never per frame.

use std::collections::VecDeque;

use nalgebra::Point2;
use ndarray::Array2;
use tracing::debug;

use crate::error::{Result, ZoneError};
use crate::zone::polygon::{Zone, signed_distance};

/// Clockwise neighbour offsets in image coordinates (y grows downwards),
/// starting east.
const DIRS: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl Zone {
    /// Grow the zone outwards by `pad_px` pixels inside a
    /// `frame_width x frame_height` frame. A pad of zero returns a copy.
    pub fn inflate(&self, pad_px: u32, frame_width: u32, frame_height: u32) -> Result<Zone> {
        if pad_px == 0 {
            return Ok(self.clone());
        }
        if frame_width == 0 || frame_height == 0 {
            return Err(ZoneError::config(format!(
                "cannot inflate zone in an empty {}x{} frame",
                frame_width, frame_height
            )));
        }

        let mask = fill_mask(self.vertices(), frame_width as usize, frame_height as usize);
        let dilated = dilate(&mask, pad_px as usize);
        let region = largest_component(&dilated)
            .ok_or_else(|| ZoneError::polygon("zone does not cover any pixel of the frame"))?;
        let contour = compress_runs(&trace_outer_contour(&region));

        debug!(
            pad_px,
            vertices_before = self.vertices().len(),
            vertices_after = contour.len(),
            "inflated zone"
        );

        let vertices = contour
            .into_iter()
            .map(|(x, y)| Point2::new(x as f32, y as f32))
            .collect();
        Zone::from_raw(vertices)
    }
}

/// Rasterize the polygon, boundary pixels included. Indexed `[y, x]`.
fn fill_mask(polygon: &[Point2<f32>], width: usize, height: usize) -> Array2<bool> {
    let mut mask = Array2::from_elem((height, width), false);

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in polygon {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let x0 = min_x.floor().max(0.0) as usize;
    let y0 = min_y.floor().max(0.0) as usize;
    let x1 = (max_x.ceil().max(0.0) as usize).min(width - 1);
    let y1 = (max_y.ceil().max(0.0) as usize).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Point2::new(x as f32, y as f32);
            if signed_distance(polygon, &p) >= 0.0 {
                mask[[y, x]] = true;
            }
        }
    }
    mask
}

fn get(mask: &Array2<bool>, x: isize, y: isize) -> bool {
    if x < 0 || y < 0 {
        return false;
    }
    mask.get([y as usize, x as usize]).copied().unwrap_or(false)
}

/// Binary dilation with a disc of the given radius. Only edge pixels
/// stamp the disc, interior pixels are already covered.
fn dilate(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    let (height, width) = mask.dim();
    let r = radius as isize;
    let offsets: Vec<(isize, isize)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
        .collect();

    let mut out = mask.clone();
    for ((y, x), &set) in mask.indexed_iter() {
        if !set {
            continue;
        }
        let (xi, yi) = (x as isize, y as isize);
        let on_edge = DIRS.iter().any(|(dx, dy)| !get(mask, xi + dx, yi + dy));
        if !on_edge {
            continue;
        }
        for (dx, dy) in &offsets {
            let (nx, ny) = (xi + dx, yi + dy);
            if nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height {
                out[[ny as usize, nx as usize]] = true;
            }
        }
    }
    out
}

/// Keep only the largest 8-connected region of the mask.
fn largest_component(mask: &Array2<bool>) -> Option<Array2<bool>> {
    let (height, width) = mask.dim();
    let mut label = Array2::<u32>::zeros((height, width));
    let mut best: Option<(u32, usize)> = None;
    let mut next_label = 0u32;
    let mut queue = VecDeque::new();

    for ((y, x), &set) in mask.indexed_iter() {
        if !set || label[[y, x]] != 0 {
            continue;
        }
        next_label += 1;
        label[[y, x]] = next_label;
        queue.push_back((x as isize, y as isize));
        let mut size = 0usize;

        while let Some((cx, cy)) = queue.pop_front() {
            size += 1;
            for (dx, dy) in DIRS {
                let (nx, ny) = (cx + dx, cy + dy);
                if get(mask, nx, ny) && label[[ny as usize, nx as usize]] == 0 {
                    label[[ny as usize, nx as usize]] = next_label;
                    queue.push_back((nx, ny));
                }
            }
        }

        if best.is_none_or(|(_, best_size)| size > best_size) {
            best = Some((next_label, size));
        }
    }

    best.map(|(keep, _)| label.mapv(|l| l == keep))
}

/// Moore-neighbour tracing of the outer boundary, clockwise on screen.
fn trace_outer_contour(region: &Array2<bool>) -> Vec<(isize, isize)> {
    let Some(((sy, sx), _)) = region.indexed_iter().find(|(_, set)| **set) else {
        return Vec::new();
    };
    let start = (sx as isize, sy as isize);
    let mut contour = vec![start];
    let mut current = start;
    // Raster order guarantees the west neighbour of the start is empty.
    let mut backtrack = 4usize;
    let mut first_dir: Option<usize> = None;
    let max_steps = 4 * region.len() + 8;

    for _ in 0..max_steps {
        let next = (1..=8)
            .map(|k| (backtrack + k) % 8)
            .find(|&d| get(region, current.0 + DIRS[d].0, current.1 + DIRS[d].1));
        let Some(d) = next else {
            break;
        };

        if current == start {
            match first_dir {
                None => first_dir = Some(d),
                Some(first) if first == d => break,
                Some(_) => {}
            }
        }

        current = (current.0 + DIRS[d].0, current.1 + DIRS[d].1);
        backtrack = (d + 6 - (d & 1)) % 8;
        contour.push(current);
    }

    if contour.len() > 1 && contour.last() == contour.first() {
        contour.pop();
    }
    contour
}

/// Drop points in the middle of straight horizontal, vertical or
/// diagonal runs, keeping the corners.
fn compress_runs(contour: &[(isize, isize)]) -> Vec<(isize, isize)> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }
    (0..n)
        .filter(|&i| {
            let prev = contour[(i + n - 1) % n];
            let here = contour[i];
            let next = contour[(i + 1) % n];
            (here.0 - prev.0, here.1 - prev.1) != (next.0 - here.0, next.1 - here.1)
        })
        .map(|i| contour[i])
        .collect()
}
