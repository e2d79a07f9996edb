//! Simulation configuration.
//!
//! All knobs that shape a superstep: timestep width, parallel width,
//! integrator tolerance, terminal surfaces, detection thresholds, and
//! whitelists. Values are validated at the boundary; the engine core
//! never sees an invalid configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use kessler_types::{constants, KesslerError, KesslerResult};

/// The reentry surface particles are checked against during
/// propagation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReentryRadius {
    /// No reentry checking.
    #[default]
    Disabled,
    /// Sphere of the given radius around the origin.
    Sphere(f64),
    /// Triaxial ellipsoid with the given semiaxes.
    Ellipsoid([f64; 3]),
}

impl ReentryRadius {
    /// Semiaxes of the surface, when enabled.
    pub fn semiaxes(&self) -> Option<[f64; 3]> {
        match *self {
            ReentryRadius::Disabled => None,
            ReentryRadius::Sphere(r) => Some([r; 3]),
            ReentryRadius::Ellipsoid(axes) => Some(axes),
        }
    }
}

/// What happens when a superstep detects collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The superstep is truncated at the earliest collision: the
    /// global state is densely propagated to that time, and only
    /// events up to it are reported.
    #[default]
    StopAtFirst,
    /// The superstep completes; every collision is reported.
    ReportAll,
}

/// Configuration for a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Collisional timestep width (finite, > 0).
    pub ct: f64,
    /// Number of collisional timesteps processed per `step()` call
    /// (>= 1); also the number of chunks the superstep is cut into.
    pub n_par_ct: usize,
    /// Integrator local error tolerance (> 0).
    pub tol: f64,
    /// Selects the compensated-summation integrator kernel.
    pub high_accuracy: bool,
    /// Reentry surface.
    pub reentry_radius: ReentryRadius,
    /// Domain exit radius; 0 disables.
    pub exit_radius: f64,
    /// Conjunction distance threshold; 0 disables conjunctions.
    pub conj_thresh: f64,
    /// Collisions are only reported when `r_i + r_j` reaches this
    /// floor; 0 enables all pairs.
    pub min_coll_radius: f64,
    /// When non-empty, restricts collision detection to whitelisted
    /// particles.
    pub coll_whitelist: BTreeSet<usize>,
    /// When non-empty, restricts conjunction detection to whitelisted
    /// particles.
    pub conj_whitelist: BTreeSet<usize>,
    /// Collision reporting policy.
    pub collision_policy: CollisionPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ct: constants::DEFAULT_CT,
            n_par_ct: 1,
            tol: constants::DEFAULT_TOL,
            high_accuracy: false,
            reentry_radius: ReentryRadius::Disabled,
            exit_radius: 0.0,
            conj_thresh: 0.0,
            min_coll_radius: 0.0,
            coll_whitelist: BTreeSet::new(),
            conj_whitelist: BTreeSet::new(),
            collision_policy: CollisionPolicy::StopAtFirst,
        }
    }
}

impl SimConfig {
    /// Validates every knob; the error message states the offending
    /// value.
    pub fn validate(&self) -> KesslerResult<()> {
        validate_ct(self.ct)?;
        if self.n_par_ct == 0 {
            return Err(KesslerError::InvalidArgument(
                "n_par_ct must be at least 1, got 0".into(),
            ));
        }
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(KesslerError::InvalidArgument(format!(
                "integrator tolerance must be finite and positive, got {}",
                self.tol
            )));
        }
        if let Some(axes) = self.reentry_radius.semiaxes() {
            if axes.iter().any(|a| !a.is_finite() || *a <= 0.0) {
                return Err(KesslerError::InvalidArgument(format!(
                    "reentry radius components must be finite and positive, got {axes:?}"
                )));
            }
        }
        if !self.exit_radius.is_finite() || self.exit_radius < 0.0 {
            return Err(KesslerError::InvalidArgument(format!(
                "exit radius must be finite and non-negative, got {}",
                self.exit_radius
            )));
        }
        if !self.conj_thresh.is_finite() || self.conj_thresh < 0.0 {
            return Err(KesslerError::InvalidArgument(format!(
                "conjunction threshold must be finite and non-negative, got {}",
                self.conj_thresh
            )));
        }
        if !self.min_coll_radius.is_finite() || self.min_coll_radius < 0.0 {
            return Err(KesslerError::InvalidArgument(format!(
                "minimum collision radius must be finite and non-negative, got {}",
                self.min_coll_radius
            )));
        }
        Ok(())
    }

    /// Validates whitelist indices against the particle count.
    pub fn validate_whitelists(&self, nparts: usize) -> KesslerResult<()> {
        for (name, set) in [
            ("collision", &self.coll_whitelist),
            ("conjunction", &self.conj_whitelist),
        ] {
            if let Some(&bad) = set.iter().find(|&&idx| idx >= nparts) {
                return Err(KesslerError::InvalidArgument(format!(
                    "{name} whitelist references particle {bad}, but only {nparts} exist"
                )));
            }
        }
        Ok(())
    }
}

/// Validates a collisional timestep value.
pub fn validate_ct(ct: f64) -> KesslerResult<()> {
    if !ct.is_finite() || ct <= 0.0 {
        return Err(KesslerError::InvalidArgument(format!(
            "collisional timestep must be finite and positive, got {ct}"
        )));
    }
    Ok(())
}
