//! Simulation defaults shared across the workspace.

/// Number of state variables per particle: x, y, z, vx, vy, vz, r.
pub const NVARS: usize = 7;

/// Default collisional timestep (superstep width per `n_par_ct` unit).
pub const DEFAULT_CT: f64 = 1.0;

/// Default integrator tolerance: machine epsilon.
pub const DEFAULT_TOL: f64 = f64::EPSILON;

/// Width at which root isolation and bisection stop, in normalized
/// unit-interval coordinates.
pub const ROOT_REFINE_EPS: f64 = 1.0e-13;
