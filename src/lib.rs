//! Zone occupancy counting over a stream of per-frame detections.
//!
//! Detections of each frame pass through a rider filter and a greedy
//! centroid tracker; a per-track state machine then decides when a track
//! enters or leaves a polygonal zone, and confirmed traversals are
//! reported to an [`EventSink`] together with the live occupancy.
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use zonecount_rs::{CounterConfig, Detection, MemorySink, Zone, ZoneCounter};
//!
//! let zone = Zone::from_points(&[(100.0, 100.0), (300.0, 100.0), (300.0, 300.0), (100.0, 300.0)])?;
//! let sink = Arc::new(MemorySink::new());
//! let mut counter = ZoneCounter::new(1, 1, zone, CounterConfig::default(), sink.clone())?;
//!
//! let report = counter.process_frame(&[Detection::person(190.0, 60.0, 210.0, 140.0, 0.9)], Utc::now());
//! println!("occupancy {}", report.occupancy);
//! # Ok::<(), zonecount_rs::ZoneError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod integration;
pub mod rider;
pub mod sink;
pub mod tracker;
pub mod zone;

pub use config::CounterConfig;
pub use error::{Result, SinkError, ZoneError};
pub use event::{AreaId, Direction, Event, OccupancySnapshot, StreamId};
pub use integration::{
    CountTotals, CountingPipeline, DetectionBuilder, DetectionSource, FrameReport,
    IntoDetections, ZoneCounter,
};
pub use rider::{RiderFilter, filter_riders};
pub use sink::{Backpressure, EventSink, MemorySink, NullSink, QueuedSink, SinkStats};
pub use tracker::{CentroidTracker, Detection, MatchStrategy, ObjectClass, Rect, TrackId, TrackedObject, TrackerConfig};
pub use zone::{ConfirmPolicy, DedupPolicy, MembershipSignal, OccupancyConfig, Zone, ZoneOccupancy};
