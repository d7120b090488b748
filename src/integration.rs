//! Wiring between detection backends, the tracker, the zone state
//! machine and the event sink.

mod builder;
mod counter;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use counter::{CountTotals, FrameReport, ZoneCounter};
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::CountingPipeline;
