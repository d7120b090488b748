//! Per-(stream, area) counting engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::CounterConfig;
use crate::error::Result;
use crate::event::{AreaId, Direction, Event, OccupancySnapshot, StreamId};
use crate::rider::RiderFilter;
use crate::sink::EventSink;
use crate::tracker::{CentroidTracker, Detection, TrackedObject};
use crate::zone::{Zone, ZoneOccupancy};

/// Frames between two debug summaries.
const SUMMARY_INTERVAL: u64 = 300;

/// Outcome of one [`ZoneCounter::process_frame`] call.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 1-based index of the frame since creation or the last reset
    pub frame_index: u64,
    /// All live tracks after the update, coasting ones included
    pub tracks: Vec<TrackedObject>,
    /// ENTER/EXIT events emitted this frame
    pub events: Vec<Event>,
    /// Tracks inside the zone after this frame
    pub occupancy: usize,
}

/// Cumulative counts since the counter was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountTotals {
    pub enters: u64,
    pub exits: u64,
    pub occupancy: usize,
}

/// Turns per-frame detections of one camera into ENTER/EXIT events and a
/// live occupancy count for one zone.
///
/// Frames must be fed strictly in order, including frames without any
/// detection. Counters for different streams or areas are independent
/// and can share one sink.
pub struct ZoneCounter {
    stream_id: StreamId,
    area_id: AreaId,
    tracker: CentroidTracker,
    occupancy: ZoneOccupancy,
    rider_filter: RiderFilter,
    sink: Arc<dyn EventSink>,
    frame_index: u64,
    enters: u64,
    exits: u64,
    sink_failures: u64,
}

impl ZoneCounter {
    /// Validate the configuration, pad the zone if requested and set up
    /// an empty session.
    pub fn new(
        stream_id: StreamId,
        area_id: AreaId,
        zone: Zone,
        config: CounterConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let zone = match (config.zone_padding_px, config.frame_size) {
            (0, _) | (_, None) => zone,
            (pad, Some([w, h])) => {
                let padded = zone.inflate(pad, w, h)?;
                debug!(
                    stream_id,
                    area_id,
                    pad,
                    vertices = padded.vertices().len(),
                    "zone padded"
                );
                padded
            }
        };

        info!(
            stream_id,
            area_id,
            vertices = zone.vertices().len(),
            area = zone.area(),
            "zone counter ready"
        );

        Ok(Self {
            stream_id,
            area_id,
            tracker: CentroidTracker::new(config.tracker),
            occupancy: ZoneOccupancy::new(zone, config.occupancy),
            rider_filter: RiderFilter::new(config.rider_iou_threshold),
            sink,
            frame_index: 0,
            enters: 0,
            exits: 0,
            sink_failures: 0,
        })
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn area_id(&self) -> AreaId {
        self.area_id
    }

    /// The zone actually counted against, after padding.
    pub fn zone(&self) -> &Zone {
        self.occupancy.zone()
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy.occupancy()
    }

    pub fn totals(&self) -> CountTotals {
        CountTotals {
            enters: self.enters,
            exits: self.exits,
            occupancy: self.occupancy.occupancy(),
        }
    }

    /// Sink writes that failed since creation.
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }

    /// Process one frame's detections, all classes mixed.
    ///
    /// Malformed boxes are dropped, riders are filtered out and the
    /// remaining persons drive the tracker and the zone state machine.
    /// Sink failures are logged and counted but never fail the frame.
    pub fn process_frame(
        &mut self,
        detections: &[Detection],
        timestamp: DateTime<Utc>,
    ) -> FrameReport {
        self.frame_index += 1;

        let valid: Vec<Detection> = detections
            .iter()
            .filter(|d| {
                let ok = !d.bbox.is_degenerate();
                if !ok {
                    debug!(frame = self.frame_index, bbox = ?d.bbox, "dropping degenerate detection");
                }
                ok
            })
            .cloned()
            .collect();

        let persons = self.rider_filter.apply(&valid);
        let tracks = self.tracker.update(&persons);
        let transitions = self.occupancy.update(&tracks);

        let events: Vec<Event> = transitions
            .into_iter()
            .map(|t| Event {
                stream_id: self.stream_id,
                area_id: self.area_id,
                track_id: t.track_id,
                direction: t.direction,
                timestamp,
            })
            .collect();

        for event in &events {
            match event.direction {
                Direction::Enter => self.enters += 1,
                Direction::Exit => self.exits += 1,
            }
            debug!(
                stream_id = self.stream_id,
                area_id = self.area_id,
                track_id = event.track_id,
                direction = %event.direction,
                frame = self.frame_index,
                "zone event"
            );
            if let Err(e) = self.sink.record_event(event) {
                self.sink_failures += 1;
                warn!(track_id = event.track_id, "failed to record event: {}", e);
            }
        }

        let occupancy = self.occupancy.occupancy();
        let snapshot = OccupancySnapshot {
            stream_id: self.stream_id,
            area_id: self.area_id,
            count: occupancy,
            timestamp,
        };
        if let Err(e) = self.sink.update_live_occupancy(&snapshot) {
            self.sink_failures += 1;
            warn!(count = occupancy, "failed to update live occupancy: {}", e);
        }

        if self.frame_index % SUMMARY_INTERVAL == 0 {
            debug!(
                stream_id = self.stream_id,
                area_id = self.area_id,
                frame = self.frame_index,
                tracks = tracks.len(),
                occupancy,
                enters = self.enters,
                exits = self.exits,
                sink_failures = self.sink_failures,
                "counter summary"
            );
        }

        FrameReport {
            frame_index: self.frame_index,
            tracks,
            events,
            occupancy,
        }
    }

    /// Start over after a stream discontinuity. Tracker and zone state
    /// are dropped; cumulative totals are kept and new track ids never
    /// collide with ids issued before the reset.
    pub fn reset(&mut self) {
        info!(
            stream_id = self.stream_id,
            area_id = self.area_id,
            frame = self.frame_index,
            "zone counter reset"
        );
        self.tracker.reset();
        self.occupancy.reset();
        self.frame_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, ZoneError};
    use crate::sink::MemorySink;
    use crate::tracker::ObjectClass;

    fn square() -> Zone {
        Zone::from_points(&[(100.0, 100.0), (300.0, 100.0), (300.0, 300.0), (100.0, 300.0)])
            .unwrap()
    }

    /// Person whose bottom-center sits at (cx, bottom).
    fn person_at(cx: f32, bottom: f32) -> Detection {
        Detection::person(cx - 10.0, bottom - 40.0, cx + 10.0, bottom, 0.9)
    }

    fn counter(sink: Arc<dyn EventSink>) -> ZoneCounter {
        ZoneCounter::new(1, 2, square(), CounterConfig::default(), sink).unwrap()
    }

    #[test]
    fn test_walk_in_and_out() {
        let sink = Arc::new(MemorySink::new());
        let mut counter = counter(sink.clone());
        let ts = Utc::now();

        for bottom in (40..=380).step_by(20) {
            counter.process_frame(&[person_at(200.0, bottom as f32)], ts);
        }

        let directions: Vec<Direction> = sink.events().iter().map(|e| e.direction).collect();
        assert_eq!(directions, vec![Direction::Enter, Direction::Exit]);
        assert_eq!(
            counter.totals(),
            CountTotals {
                enters: 1,
                exits: 1,
                occupancy: 0
            }
        );
        assert_eq!(sink.live_occupancy(1, 2), Some(0));
        assert!(sink.events().iter().all(|e| e.stream_id == 1 && e.area_id == 2));
    }

    #[test]
    fn test_riders_and_degenerate_boxes_ignored() {
        let sink = Arc::new(MemorySink::new());
        let mut counter = counter(sink.clone());
        let ts = Utc::now();

        for bottom in (40..=200).step_by(20) {
            let b = bottom as f32;
            let frame = [
                person_at(200.0, b),
                Detection::new(188.0, b - 38.0, 212.0, b + 2.0, 0.8, ObjectClass::Bicycle),
                Detection::person(f32::NAN, 0.0, 10.0, 10.0, 0.9),
                Detection::person(150.0, 150.0, 150.0, 190.0, 0.9),
            ];
            let report = counter.process_frame(&frame, ts);
            assert!(report.tracks.is_empty());
        }
        assert!(sink.events().is_empty());
        assert_eq!(counter.occupancy(), 0);
    }

    struct RejectingSink;

    impl EventSink for RejectingSink {
        fn record_event(&self, _event: &Event) -> std::result::Result<(), SinkError> {
            Err(SinkError::Rejected("read-only".into()))
        }

        fn update_live_occupancy(
            &self,
            _snapshot: &OccupancySnapshot,
        ) -> std::result::Result<(), SinkError> {
            Err(SinkError::Disconnected)
        }
    }

    #[test]
    fn test_sink_failures_do_not_stop_counting() {
        let mut counter = counter(Arc::new(RejectingSink));
        let ts = Utc::now();
        let mut events = 0;
        for bottom in (40..=200).step_by(20) {
            events += counter
                .process_frame(&[person_at(200.0, bottom as f32)], ts)
                .events
                .len();
        }
        assert_eq!(events, 1);
        assert_eq!(counter.totals().enters, 1);
        // one failed event write plus one failed snapshot per frame
        assert_eq!(counter.sink_failures(), 1 + 9);
    }

    #[test]
    fn test_reset_keeps_totals_and_fresh_ids() {
        let sink = Arc::new(MemorySink::new());
        let mut counter = counter(sink.clone());
        let ts = Utc::now();
        for bottom in (40..=200).step_by(20) {
            counter.process_frame(&[person_at(200.0, bottom as f32)], ts);
        }
        assert_eq!(counter.occupancy(), 1);

        counter.reset();
        assert_eq!(counter.occupancy(), 0);
        assert_eq!(counter.totals().enters, 1);

        let report = counter.process_frame(&[person_at(200.0, 200.0)], ts);
        assert_eq!(report.frame_index, 1);
        assert_eq!(report.tracks[0].id, 2);
        // first observation after a reset is silent
        assert!(report.events.is_empty());
        assert_eq!(report.occupancy, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CounterConfig {
            rider_iou_threshold: 0.0,
            ..Default::default()
        };
        let err = ZoneCounter::new(1, 1, square(), config, Arc::new(MemorySink::new()))
            .err()
            .unwrap();
        assert!(matches!(err, ZoneError::InvalidConfig(_)));
    }

    #[test]
    fn test_padding_grows_zone() {
        let config = CounterConfig {
            zone_padding_px: 10,
            frame_size: Some([640, 480]),
            ..Default::default()
        };
        let counter = ZoneCounter::new(1, 1, square(), config, Arc::new(MemorySink::new())).unwrap();
        assert!(counter.zone().area() > square().area());
    }
}
