//! # kessler-telemetry
//!
//! Superstep telemetry for the screening engine. The engine records
//! each superstep's lifecycle (opening, per-phase timings, closing
//! counts) through a [`TelemetryRecorder`], which delivers structured
//! events synchronously to pluggable sinks (`tracing`, in-memory
//! capture, custom exporters).

pub mod events;
pub mod recorder;
pub mod sinks;

pub use events::{EventKind, Phase, SuperstepEvent};
pub use recorder::TelemetryRecorder;
pub use sinks::{EventSink, TracingSink, VecSink};
