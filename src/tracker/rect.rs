use nalgebra::Point2;
use ndarray::Array2;

/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Stored as top-left corner plus size (TLWH). Detectors usually hand
/// out corner pairs, use [`Rect::from_tlbr`] for those.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning the corners (x1, y1) and (x2, y2).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Corner form `[x1, y1, x2, y2]`.
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Bottom-center of the box, where the subject touches the ground.
    #[inline]
    pub fn bottom_center(&self) -> Point2<f32> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when every coordinate is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// True for boxes that cannot describe a real object: non-finite
    /// coordinates or a non-positive width or height.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.width <= 0.0 || self.height <= 0.0
    }

    /// Area of the axis-aligned overlap with `other`, zero when disjoint.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    /// Intersection over union, zero for disjoint or empty boxes.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Pairwise IoU, rows follow `rows`, columns follow `cols`.
pub fn iou_batch(rows: &[Rect], cols: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| rows[i].iou(&cols[j]))
}
