//! Bounded-queue dispatcher that keeps a slow sink off the frame path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};
use tracing::{debug, warn};

use crate::error::{Result, SinkError};
use crate::event::{Event, OccupancySnapshot};
use crate::sink::EventSink;

/// What to do when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Evict the oldest pending write to make room.
    #[default]
    DropOldest,
    /// Block the producer up to the timeout, then drop the new write.
    BlockFor(Duration),
}

enum SinkCommand {
    Event(Event),
    Occupancy(OccupancySnapshot),
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery statistics of a [`QueuedSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Writes the inner sink accepted
    pub delivered: u64,
    /// Writes the inner sink rejected
    pub failed: u64,
    /// Writes discarded by the backpressure policy or after shutdown
    pub dropped: u64,
}

/// Wraps an [`EventSink`] behind a bounded channel drained by a
/// dedicated thread. Producers never wait longer than the backpressure
/// policy allows; inner sink failures are logged and counted.
pub struct QueuedSink {
    tx: RwLock<Option<Sender<SinkCommand>>>,
    // Second handle on the queue so the producer side can evict.
    rx: Receiver<SinkCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
    policy: Backpressure,
}

impl QueuedSink {
    pub fn new<S>(inner: S, capacity: usize, policy: Backpressure) -> Result<Self>
    where
        S: EventSink + 'static,
    {
        let (tx, rx) = bounded::<SinkCommand>(capacity.max(1));
        let counters = Arc::new(Counters::default());

        let worker_rx = rx.clone();
        let worker_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name("zone-sink".to_string())
            .spawn(move || {
                debug!("sink worker started");
                while let Ok(cmd) = worker_rx.recv() {
                    let result = match &cmd {
                        SinkCommand::Event(event) => inner.record_event(event),
                        SinkCommand::Occupancy(snapshot) => inner.update_live_occupancy(snapshot),
                    };
                    match result {
                        Ok(()) => {
                            worker_counters.delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                            warn!("sink write failed: {}", e);
                        }
                    }
                }
                debug!("sink worker stopped");
            })?;

        Ok(Self {
            tx: RwLock::new(Some(tx)),
            rx,
            worker: Mutex::new(Some(handle)),
            counters,
            policy,
        })
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Writes waiting in the queue.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Stop accepting writes, deliver everything still queued and join
    /// the worker. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let tx = self.tx.write().unwrap_or_else(|e| e.into_inner()).take();
        drop(tx);

        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("sink worker panicked");
            }
        }
    }

    fn drop_one(&self) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn enqueue(&self, cmd: SinkCommand) -> std::result::Result<(), SinkError> {
        let guard = self.tx.read().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = guard.as_ref() else {
            self.drop_one();
            return Err(SinkError::Disconnected);
        };

        match self.policy {
            Backpressure::DropOldest => {
                let mut cmd = cmd;
                loop {
                    match tx.try_send(cmd) {
                        Ok(()) => return Ok(()),
                        Err(TrySendError::Full(rejected)) => {
                            if self.rx.try_recv().is_ok() {
                                self.drop_one();
                                warn!("sink queue full, dropped oldest pending write");
                            }
                            cmd = rejected;
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            self.drop_one();
                            return Err(SinkError::Disconnected);
                        }
                    }
                }
            }
            Backpressure::BlockFor(timeout) => match tx.send_timeout(cmd, timeout) {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => {
                    self.drop_one();
                    warn!(?timeout, "sink queue full, dropped write after timeout");
                    Err(SinkError::QueueFull)
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    self.drop_one();
                    Err(SinkError::Disconnected)
                }
            },
        }
    }
}

impl EventSink for QueuedSink {
    fn record_event(&self, event: &Event) -> std::result::Result<(), SinkError> {
        self.enqueue(SinkCommand::Event(event.clone()))
    }

    fn update_live_occupancy(
        &self,
        snapshot: &OccupancySnapshot,
    ) -> std::result::Result<(), SinkError> {
        self.enqueue(SinkCommand::Occupancy(snapshot.clone()))
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
