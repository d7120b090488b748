//! In-memory event sink.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Timelike, Utc};

use crate::error::SinkError;
use crate::event::{AreaId, Direction, Event, OccupancySnapshot, StreamId};
use crate::sink::EventSink;

/// ENTER/EXIT totals of one one-minute window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinuteCount {
    pub enters: u64,
    pub exits: u64,
}

#[derive(Default)]
struct Tables {
    events: Vec<Event>,
    live: HashMap<(StreamId, AreaId), OccupancySnapshot>,
    minutes: BTreeMap<(StreamId, AreaId, DateTime<Utc>), MinuteCount>,
}

/// Keeps an event log, a last-write-wins live occupancy table and
/// per-minute aggregates, mirroring what a database-backed sink stores.
#[derive(Default)]
pub struct MemorySink {
    tables: Mutex<Tables>,
}

fn minute_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave the tables half
        // written, so a poisoned lock is still usable.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<Event> {
        self.tables().events.clone()
    }

    pub fn events_for(&self, stream_id: StreamId, area_id: AreaId) -> Vec<Event> {
        self.tables()
            .events
            .iter()
            .filter(|e| e.stream_id == stream_id && e.area_id == area_id)
            .cloned()
            .collect()
    }

    pub fn live_occupancy(&self, stream_id: StreamId, area_id: AreaId) -> Option<usize> {
        self.tables()
            .live
            .get(&(stream_id, area_id))
            .map(|s| s.count)
    }

    /// Per-minute aggregates of one (stream, area), oldest window first.
    pub fn minute_counts(
        &self,
        stream_id: StreamId,
        area_id: AreaId,
    ) -> Vec<(DateTime<Utc>, MinuteCount)> {
        self.tables()
            .minutes
            .iter()
            .filter(|((s, a, _), _)| *s == stream_id && *a == area_id)
            .map(|((_, _, start), count)| (*start, *count))
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record_event(&self, event: &Event) -> Result<(), SinkError> {
        let mut tables = self.tables();
        let window = (event.stream_id, event.area_id, minute_start(event.timestamp));
        let count = tables.minutes.entry(window).or_default();
        match event.direction {
            Direction::Enter => count.enters += 1,
            Direction::Exit => count.exits += 1,
        }
        tables.events.push(event.clone());
        Ok(())
    }

    fn update_live_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<(), SinkError> {
        self.tables()
            .live
            .insert((snapshot.stream_id, snapshot.area_id), snapshot.clone());
        Ok(())
    }
}
