//! # kessler-detect
//!
//! The per-superstep collision/conjunction detection pipeline.
//!
//! A superstep's trajectory data flows through five phases, each
//! separated from the next by a parallel-join barrier:
//!
//! 1. **AABB/Morton build** — per (chunk, particle) trajectory boxes
//!    and Z-order keys ([`bboxes`])
//! 2. **Indirect sort** — particles ordered by Morton code ([`sorter`])
//! 3. **BVH build** — one linear BVH per chunk ([`bvh`])
//! 4. **Broad phase** — BVH traversal emitting candidate pairs
//!    ([`broad`])
//! 5. **Narrow phase** — polynomial root isolation producing event
//!    times ([`narrow`], [`roots`])
//!
//! [`pipeline::DetectionPipeline`] owns the inter-phase buffers and
//! runs all five phases for one superstep.

pub mod bboxes;
pub mod broad;
pub mod bvh;
pub mod chunker;
pub mod events;
pub mod narrow;
pub mod pipeline;
pub mod roots;
pub mod sorter;

pub use chunker::Chunker;
pub use events::{Collision, Conjunction, TerminalEvent};
pub use pipeline::{DetectionPipeline, DetectionReport, DetectionSettings, PhaseTimings};
pub use roots::RootFinder;
