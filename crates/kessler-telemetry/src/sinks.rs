//! Pluggable event sinks.
//!
//! Sinks consume events from the recorder and process them (log them,
//! collect them, forward them to an exporter).

use crate::events::SuperstepEvent;

/// Trait for event consumers.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SuperstepEvent);

    /// Called when the run ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// A sink that collects events in a `Vec` for tests and inspection.
#[derive(Default)]
pub struct VecSink {
    /// Collected events.
    pub events: Vec<SuperstepEvent>,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SuperstepEvent) {
        self.events.push(event.clone());
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events through the `tracing` crate.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SuperstepEvent) {
        tracing::info!(
            superstep = event.superstep,
            event = ?event.kind,
            "telemetry_event"
        );
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
