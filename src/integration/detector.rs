//! Trait for object detection backends feeding the counter.

use crate::tracker::Detection;

/// Anything that turns a frame into detections.
///
/// The counter only needs persons, bicycles and motorcycles; other
/// classes may be returned and are ignored.
///
/// ```ignore
/// struct MyDetector { /* model handle */ }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &[u8], width: u32, height: u32) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    type Error;

    /// Run inference on one raw frame of `width` x `height` pixels.
    fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

/// Conversion from a model-specific output type.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// `(x1, y1, x2, y2, score, coco_class_id)` rows, the layout most YOLO
/// post-processing emits after NMS.
impl IntoDetections for Vec<[f32; 6]> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .filter(|row| row[5] >= 0.0)
            .map(|[x1, y1, x2, y2, score, class]| {
                Detection::new(
                    x1,
                    y1,
                    x2,
                    y2,
                    score,
                    crate::tracker::ObjectClass::from_coco_id(class as u32),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::ObjectClass;

    #[test]
    fn test_rows_into_detections() {
        let rows = vec![
            [0.0, 0.0, 10.0, 20.0, 0.9, 0.0],
            [5.0, 5.0, 30.0, 40.0, 0.8, 1.0],
        ];
        let dets = rows.into_detections();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class, ObjectClass::Person);
        assert_eq!(dets[1].class, ObjectClass::Bicycle);
    }
}
