//! Detection event types.
//!
//! Lightweight value records produced by the pipeline. Times are
//! relative to the superstep start.

use serde::{Deserialize, Serialize};

use kessler_types::TerminalCode;

/// A particle-particle collision: the pair touched at time `t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    /// Lower particle index.
    pub i: u32,
    /// Higher particle index (`i < j`).
    pub j: u32,
    /// Collision time, relative to the superstep start.
    pub t: f64,
}

/// A conjunction: a local minimum of the pair distance below the
/// configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conjunction {
    /// Lower particle index.
    pub i: u32,
    /// Higher particle index (`i < j`).
    pub j: u32,
    /// Time of closest approach, relative to the superstep start.
    pub t: f64,
    /// Miss distance at closest approach.
    pub dist: f64,
}

/// A terminal event: the particle stopped propagating for the rest of
/// the superstep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalEvent {
    /// Affected particle.
    pub particle: u32,
    /// Event time, relative to the superstep start.
    pub t: f64,
    /// Why propagation stopped.
    pub code: TerminalCode,
}
