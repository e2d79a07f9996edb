//! Per-particle trajectory capture for one superstep.
//!
//! [`StepData`] records the dense output of a propagation: the Taylor
//! coefficient tensor of every accepted substep (row-major
//! `[n_substeps x 7 x (order + 1)]`) and the substep end times in
//! double-double precision, relative to the superstep start.
//!
//! A particle that hits a terminal event stops early; `valid_until`
//! marks the horizon up to which the recorded trajectory is
//! meaningful.

use kessler_math::{poly, DDouble};
use kessler_types::constants::NVARS;

use crate::integrator::Substep;

/// Dense trajectory record for one particle over one superstep.
#[derive(Debug, Clone, Default)]
pub struct StepData {
    /// Integration order of the recorded coefficients.
    pub order: usize,
    /// Taylor coefficients, row-major `[n_substeps x 7 x (order + 1)]`.
    pub tcs: Vec<f64>,
    /// End time of each substep, relative to the superstep start.
    /// Strictly increasing; the last entry reaches the superstep end
    /// unless the particle terminated early.
    pub tcoords: Vec<DDouble>,
    /// Horizon up to which the trajectory is valid (the superstep
    /// width, or the terminal-event time).
    pub valid_until: f64,
}

impl StepData {
    /// Clears the record for a fresh superstep.
    pub fn reset(&mut self, order: usize, valid_until: f64) {
        self.order = order;
        self.tcs.clear();
        self.tcoords.clear();
        self.valid_until = valid_until;
    }

    /// Number of recorded substeps.
    pub fn n_substeps(&self) -> usize {
        self.tcoords.len()
    }

    /// Appends one accepted substep.
    pub fn record(&mut self, sub: &Substep<'_>) {
        debug_assert_eq!(sub.order, self.order);
        self.tcs.extend_from_slice(sub.coeffs);
        self.tcoords.push(sub.end);
    }

    /// Start time of substep `k`.
    pub fn substep_begin(&self, k: usize) -> DDouble {
        if k == 0 {
            DDouble::ZERO
        } else {
            self.tcoords[k - 1]
        }
    }

    /// Coefficients of one state variable on substep `k`.
    pub fn coeffs(&self, k: usize, var: usize) -> &[f64] {
        let len = self.order + 1;
        let base = (k * NVARS + var) * len;
        &self.tcs[base..base + len]
    }

    /// Index of the substep whose interval contains time `t`
    /// (relative to the superstep start), if the trajectory extends
    /// that far.
    pub fn substep_for(&self, t: f64) -> Option<usize> {
        self.tcoords.iter().position(|end| end.to_f64() > t).or({
            // Allow evaluation exactly at the final boundary.
            if self
                .tcoords
                .last()
                .is_some_and(|end| end.to_f64() >= t)
            {
                Some(self.tcoords.len() - 1)
            } else {
                None
            }
        })
    }

    /// Dense state evaluation at time `t` (relative to the superstep
    /// start). Returns false when the trajectory does not reach `t`.
    pub fn eval_state(&self, t: f64, out: &mut [f64; NVARS]) -> bool {
        let Some(k) = self.substep_for(t) else {
            return false;
        };
        let tau = DDouble::new(t).diff(self.substep_begin(k));
        for (var, slot) in out.iter_mut().enumerate() {
            *slot = poly::eval(self.coeffs(k, var), tau);
        }
        true
    }
}
