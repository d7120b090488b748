//! Suppression of person detections that are riding a bicycle or motorcycle.
//!
//! A rider shows up twice, once as a person and once as the vehicle.
//! Only pedestrians are counted, so persons overlapping a two-wheeler
//! above an IoU threshold are dropped.

use tracing::trace;

use crate::tracker::{Detection, ObjectClass, Rect, iou_batch};

/// Persons whose best IoU against any rider box is below `iou_threshold`.
pub fn filter_riders(persons: &[Rect], riders: &[Rect], iou_threshold: f32) -> Vec<Rect> {
    keep_mask(persons, riders, iou_threshold)
        .into_iter()
        .zip(persons)
        .filter_map(|(keep, person)| keep.then_some(*person))
        .collect()
}

fn keep_mask(persons: &[Rect], riders: &[Rect], iou_threshold: f32) -> Vec<bool> {
    if riders.is_empty() {
        return vec![true; persons.len()];
    }
    let ious = iou_batch(persons, riders);
    ious.rows()
        .into_iter()
        .map(|row| {
            let max_iou = row.iter().copied().fold(0.0_f32, f32::max);
            max_iou < iou_threshold
        })
        .collect()
}

/// Keeps person detections that are not riding a two-wheeler.
#[derive(Debug, Clone, Copy)]
pub struct RiderFilter {
    /// Persons whose best IoU against a bicycle or motorcycle reaches
    /// this value are dropped
    pub iou_threshold: f32,
}

impl Default for RiderFilter {
    fn default() -> Self {
        Self {
            iou_threshold: 0.25,
        }
    }
}

impl RiderFilter {
    /// Create a filter with the given IoU threshold.
    pub fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    /// Split a frame's detections by class and return the person
    /// detections that survive the filter, in input order.
    pub fn apply(&self, detections: &[Detection]) -> Vec<Detection> {
        let persons: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.class == ObjectClass::Person)
            .collect();
        let riders: Vec<Rect> = detections
            .iter()
            .filter(|d| d.class.is_rider_vehicle())
            .map(|d| d.bbox)
            .collect();

        let person_boxes: Vec<Rect> = persons.iter().map(|d| d.bbox).collect();
        let keep = keep_mask(&person_boxes, &riders, self.iou_threshold);

        let kept: Vec<Detection> = persons
            .into_iter()
            .zip(keep)
            .filter_map(|(det, keep)| keep.then(|| det.clone()))
            .collect();

        if kept.len() < person_boxes.len() {
            trace!(
                dropped = person_boxes.len() - kept.len(),
                riders = riders.len(),
                "rider filter dropped persons"
            );
        }
        kept
    }
}
