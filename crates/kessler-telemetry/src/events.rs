//! Telemetry event types.
//!
//! Structured events emitted by the engine around each superstep.
//! Events are lightweight value types carrying just enough data for
//! monitoring and debugging.

use serde::{Deserialize, Serialize};

/// Pipeline phase identifiers for timing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Numerical propagation of all particles.
    Propagation,
    /// AABB and Morton code construction.
    Bboxes,
    /// Indirect Morton sort.
    Sort,
    /// BVH construction.
    Bvh,
    /// Broad-phase traversal.
    Broad,
    /// Narrow-phase root isolation.
    Narrow,
}

/// A telemetry event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperstepEvent {
    /// Superstep number (0-indexed).
    pub superstep: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventKind {
    /// Superstep started.
    SuperstepBegin {
        /// Simulation time at the superstep start.
        sim_time: f64,
        /// Number of particles.
        nparts: usize,
    },

    /// One pipeline phase finished.
    PhaseTiming {
        /// Which phase.
        phase: Phase,
        /// Wall-clock seconds.
        seconds: f64,
    },

    /// Superstep completed.
    SuperstepEnd {
        /// Broad-phase candidate pairs.
        candidates: usize,
        /// Collisions reported.
        collisions: usize,
        /// Conjunctions reported.
        conjunctions: usize,
        /// Terminal events reported.
        terminals: usize,
        /// Wall-clock seconds for the whole superstep.
        wall_time: f64,
    },
}

impl SuperstepEvent {
    /// Creates a new event for the given superstep.
    pub fn new(superstep: u64, kind: EventKind) -> Self {
        Self { superstep, kind }
    }
}
