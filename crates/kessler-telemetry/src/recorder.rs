//! Superstep telemetry recording.
//!
//! A [`TelemetryRecorder`] follows the engine through each superstep:
//! the driver reports the superstep opening, per-phase timings, and
//! the closing counts, and the recorder hands every event to its
//! sinks as it is recorded. Dispatch is synchronous — the engine only
//! records between parallel phases, so there is nothing to buffer.
//!
//! The recorder owns the superstep counter: events are tagged with
//! the current superstep, and [`superstep_end`](TelemetryRecorder::superstep_end)
//! moves the counter forward.

use crate::events::{EventKind, Phase, SuperstepEvent};
use crate::sinks::EventSink;

/// Records the lifecycle of each superstep into pluggable sinks.
pub struct TelemetryRecorder {
    sinks: Vec<Box<dyn EventSink>>,
    superstep: u64,
}

impl TelemetryRecorder {
    /// Creates a recorder with no sinks. A sinkless recorder is
    /// inert: recording costs nothing.
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            superstep: 0,
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// The superstep the next event will be tagged with.
    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    /// Records the opening of a superstep.
    pub fn superstep_begin(&mut self, sim_time: f64, nparts: usize) {
        self.dispatch(EventKind::SuperstepBegin { sim_time, nparts });
    }

    /// Records one finished pipeline phase.
    pub fn phase_timing(&mut self, phase: Phase, seconds: f64) {
        self.dispatch(EventKind::PhaseTiming { phase, seconds });
    }

    /// Records the closing counts of a superstep and advances to the
    /// next one.
    pub fn superstep_end(
        &mut self,
        candidates: usize,
        collisions: usize,
        conjunctions: usize,
        terminals: usize,
        wall_time: f64,
    ) {
        self.dispatch(EventKind::SuperstepEnd {
            candidates,
            collisions,
            conjunctions,
            terminals,
            wall_time,
        });
        self.superstep += 1;
    }

    /// Tells every sink the run is over. Flush buffers, close files.
    pub fn finish(&mut self) {
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    fn dispatch(&mut self, kind: EventKind) {
        if self.sinks.is_empty() {
            return;
        }
        let event = SuperstepEvent::new(self.superstep, kind);
        for sink in &mut self.sinks {
            sink.handle(&event);
        }
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
