//! CountingPipeline for combining detection with zone counting.

use chrono::{DateTime, Utc};

use super::{DetectionSource, FrameReport, ZoneCounter};

/// Bundles any [`DetectionSource`] with a [`ZoneCounter`] so a caller
/// only has to hand over raw frames.
pub struct CountingPipeline<D: DetectionSource> {
    detector: D,
    counter: ZoneCounter,
}

impl<D: DetectionSource> CountingPipeline<D> {
    pub fn new(detector: D, counter: ZoneCounter) -> Self {
        Self { detector, counter }
    }

    pub fn counter(&self) -> &ZoneCounter {
        &self.counter
    }

    pub fn counter_mut(&mut self) -> &mut ZoneCounter {
        &mut self.counter
    }

    /// Detect on one frame and count.
    ///
    /// A detector failure leaves the counter untouched; the caller
    /// decides whether to skip the frame or stop the stream.
    pub fn process_frame(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<FrameReport, D::Error> {
        let detections = self.detector.detect(frame, width, height)?;
        Ok(self.counter.process_frame(&detections, timestamp))
    }

    pub fn into_parts(self) -> (D, ZoneCounter) {
        (self.detector, self.counter)
    }
}
