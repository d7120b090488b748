//! Event sink interface and the implementations shipped with the crate.
//!
//! The counting engine reports every ENTER/EXIT and the live occupancy of
//! each frame to an [`EventSink`]. Sinks are shared between engines of
//! different streams, so they take `&self` and must be `Send + Sync`.

mod memory;
mod queued;

use std::sync::Arc;

use crate::error::SinkError;
use crate::event::{Event, OccupancySnapshot};

pub use memory::{MemorySink, MinuteCount};
pub use queued::{Backpressure, QueuedSink, SinkStats};

/// Consumer of counting output, typically a persistence layer.
pub trait EventSink: Send + Sync {
    /// Persist one ENTER or EXIT.
    fn record_event(&self, event: &Event) -> Result<(), SinkError>;

    /// Replace the live occupancy of the snapshot's (stream, area).
    fn update_live_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<(), SinkError>;
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn record_event(&self, event: &Event) -> Result<(), SinkError> {
        (**self).record_event(event)
    }

    fn update_live_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<(), SinkError> {
        (**self).update_live_occupancy(snapshot)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record_event(&self, event: &Event) -> Result<(), SinkError> {
        (**self).record_event(event)
    }

    fn update_live_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<(), SinkError> {
        (**self).update_live_occupancy(snapshot)
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record_event(&self, _event: &Event) -> Result<(), SinkError> {
        Ok(())
    }

    fn update_live_occupancy(&self, _snapshot: &OccupancySnapshot) -> Result<(), SinkError> {
        Ok(())
    }
}
