//! # kessler-sim
//!
//! Public façade of the Kessler conjunction screening engine.
//!
//! A [`Simulation`] owns a particle population, a dynamical system,
//! and a configuration, and advances time in supersteps. Each
//! [`Simulation::step`] call propagates every particle with an
//! adaptive Taylor integrator, runs the geometric detection pipeline
//! (chunked AABBs, Morton sort, per-chunk linear BVHs, broad and
//! narrow phases), and aggregates collision, conjunction, and terminal
//! events.
//!
//! ## Example
//!
//! ```
//! use kessler_dynamics::FreeMotion;
//! use kessler_sim::{SimConfig, Simulation, StepOutcome};
//!
//! // Two particles on a head-on course.
//! let state = vec![
//!     -1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.01, //
//!     1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.01,
//! ];
//! let config = SimConfig {
//!     ct: 2.0,
//!     ..SimConfig::default()
//! };
//! let mut sim = Simulation::new(Box::new(FreeMotion), state, vec![], config).unwrap();
//! assert_eq!(sim.step().unwrap(), StepOutcome::Collision);
//! assert_eq!(sim.collisions().len(), 1);
//! ```

pub mod config;
pub mod propagate;
pub mod sim;

pub use config::{CollisionPolicy, ReentryRadius, SimConfig};
pub use sim::Simulation;

// Event types surface through the façade.
pub use kessler_detect::{Collision, Conjunction, TerminalEvent};
pub use kessler_types::{KesslerError, KesslerResult, StepOutcome, TerminalCode};
