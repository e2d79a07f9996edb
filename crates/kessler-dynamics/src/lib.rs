//! # kessler-dynamics
//!
//! The dynamical side of the Kessler engine: ODE systems expressed as
//! Taylor coefficient recurrences, the adaptive Taylor integrator that
//! drives them, per-superstep trajectory capture, and a pool of
//! ready-to-use integrator clones.
//!
//! ## Key Types
//!
//! - [`Dynamics`] — pluggable ODE system trait (recurrence-based)
//! - [`FreeMotion`], [`PointMassGravity`] — built-in systems
//! - [`TaylorIntegrator`] — adaptive Taylor method with dense output
//! - [`StepData`] — per-particle Taylor coefficients and substep times
//! - [`IntegratorPool`] — scoped checkout of integrator instances

pub mod integrator;
pub mod pool;
pub mod step_data;
pub mod system;

pub use integrator::{PropagateResult, Substep, SubstepOutcome, TaylorIntegrator};
pub use pool::{IntegratorPool, PooledIntegrator};
pub use step_data::StepData;
pub use system::{order_for_tol, Dynamics, FreeMotion, PointMassGravity, SeriesWorkspace};
