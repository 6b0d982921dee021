//! Sink contract and in-memory implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::TraceEvent;

/// Receives runtime events. Fire and forget: `emit` must return quickly and
/// must never fail in a way that aborts the calling step. Sinks own sequence
/// assignment.
pub trait TraceSink: Send + Sync {
    fn emit(&self, event: TraceEvent);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&self, _event: TraceEvent) {}
}

/// Buffers events for inspection; the default sink for tests.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    seq: AtomicU64,
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTraceSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn events_of_kind(&self, kind: &str) -> Vec<TraceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.is_kind(kind))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TraceSink for MemoryTraceSink {
    fn emit(&self, mut event: TraceEvent) {
        event.seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.events.lock().push(event);
    }
}

/// Fans events out to live subscribers over a tokio broadcast channel.
/// Events emitted while nobody subscribes are dropped, which is fine for a
/// fire-and-forget stream.
#[derive(Debug)]
pub struct BroadcastTraceSink {
    seq: AtomicU64,
    sender: broadcast::Sender<TraceEvent>,
}

impl BroadcastTraceSink {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            seq: AtomicU64::new(0),
            sender,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.sender.subscribe()
    }
}

impl TraceSink for BroadcastTraceSink {
    fn emit(&self, mut event: TraceEvent) {
        event.seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        if let Err(err) = self.sender.send(event) {
            debug!(error = %err, "trace event dropped: no subscribers");
        }
    }
}
