//! Adaptive Taylor integrator with dense output.
//!
//! Each substep builds the full Taylor series of the state at the
//! current time (via the system's recurrences), estimates the series'
//! radius of convergence from its last two coefficient rows, and
//! advances by a fixed fraction of that radius. There is no
//! accept/reject loop: with the order chosen from the tolerance, the
//! truncation error of every step taken this way sits at the tolerance
//! level (Jorba-Zou estimate).
//!
//! The per-substep coefficients are the engine's dense output: the
//! detection pipeline consumes them as trajectory polynomials.

use std::ops::ControlFlow;

use kessler_math::{poly, DDouble};
use kessler_types::constants::NVARS;

use crate::system::{order_for_tol, Dynamics, SeriesWorkspace};

/// Fraction of the estimated radius of convergence used per substep.
const STEP_SAFETY: f64 = 0.135_335_283_236_612_7; // exp(-2)

/// Hard cap on substeps per propagation, against step-size collapse.
const MAX_SUBSTEPS: usize = 1_000_000;

/// Result of a single substep attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubstepOutcome {
    /// Advanced by the given step size.
    Advanced(f64),
    /// The series produced non-finite coefficients or the step size
    /// collapsed; the integration cannot continue.
    Breakdown,
}

/// Result of [`TaylorIntegrator::propagate_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateResult {
    /// The target time was reached.
    Complete,
    /// The substep sink requested a halt (terminal event).
    Halted,
    /// The integrator broke down mid-propagation.
    Breakdown,
}

/// View of one accepted substep, handed to the propagation sink.
pub struct Substep<'a> {
    /// State-variable coefficient rows (7 rows of `order + 1` each,
    /// contiguous).
    pub coeffs: &'a [f64],
    /// Integration order.
    pub order: usize,
    /// Substep size.
    pub h: f64,
    /// Substep start time (relative to propagation start).
    pub begin: DDouble,
    /// Substep end time.
    pub end: DDouble,
}

impl Substep<'_> {
    /// Coefficients of one state variable.
    #[inline]
    pub fn var(&self, var: usize) -> &[f64] {
        &self.coeffs[var * (self.order + 1)..(var + 1) * (self.order + 1)]
    }
}

/// Adaptive Taylor integrator for one particle.
pub struct TaylorIntegrator {
    dynamics: Box<dyn Dynamics>,
    order: usize,
    high_accuracy: bool,
    ws: SeriesWorkspace,
    state: [f64; NVARS],
    pars: Vec<f64>,
    time: DDouble,
}

impl Clone for TaylorIntegrator {
    fn clone(&self) -> Self {
        Self {
            dynamics: self.dynamics.clone(),
            order: self.order,
            high_accuracy: self.high_accuracy,
            ws: SeriesWorkspace::new(self.dynamics.naux(), self.order),
            state: self.state,
            pars: self.pars.clone(),
            time: self.time,
        }
    }
}

impl TaylorIntegrator {
    /// Builds an integrator for the given system and local tolerance.
    pub fn new(dynamics: Box<dyn Dynamics>, tol: f64, high_accuracy: bool) -> Self {
        let order = order_for_tol(tol);
        let ws = SeriesWorkspace::new(dynamics.naux(), order);
        Self {
            order,
            high_accuracy,
            ws,
            state: [0.0; NVARS],
            pars: Vec::new(),
            time: DDouble::ZERO,
            dynamics,
        }
    }

    /// Integration order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Current state.
    pub fn state(&self) -> &[f64; NVARS] {
        &self.state
    }

    /// Current time (relative to the last `set_conditions`).
    pub fn time(&self) -> DDouble {
        self.time
    }

    /// The seven state-variable coefficient rows as one contiguous
    /// slice (valid for the most recent substep).
    pub fn state_coefficients(&self) -> &[f64] {
        self.ws.state_rows()
    }

    /// Loads initial conditions for a fresh propagation.
    pub fn set_conditions(&mut self, state: [f64; NVARS], pars: &[f64], time: DDouble) {
        self.state = state;
        self.pars.clear();
        self.pars.extend_from_slice(pars);
        self.time = time;
    }

    /// Takes one substep of at most `max_h`.
    pub fn step(&mut self, max_h: f64) -> SubstepOutcome {
        self.ws.load_state(&self.state);
        self.dynamics.init_aux(&mut self.ws, &self.pars);
        for k in 0..self.order {
            self.dynamics.extend(&mut self.ws, &self.pars, k);
        }

        if !self.ws.state_rows_finite() {
            return SubstepOutcome::Breakdown;
        }

        let h = self.step_size().min(max_h);
        if !(h > 0.0) || !h.is_finite() {
            return SubstepOutcome::Breakdown;
        }

        for var in 0..NVARS {
            let row = self.ws.row(var);
            self.state[var] = if self.high_accuracy {
                poly::eval_compensated(row, h)
            } else {
                poly::eval(row, h)
            };
        }
        if self.state.iter().any(|v| !v.is_finite()) {
            return SubstepOutcome::Breakdown;
        }
        self.time = self.time.add(h);
        SubstepOutcome::Advanced(h)
    }

    /// Propagates to `t_end` (relative time), invoking `sink` after
    /// every accepted substep. The sink may halt the propagation by
    /// returning `ControlFlow::Break(())` — terminal events use this.
    pub fn propagate_until<F>(&mut self, t_end: f64, mut sink: F) -> PropagateResult
    where
        F: FnMut(&Substep<'_>) -> ControlFlow<()>,
    {
        let target = DDouble::new(t_end);
        for _ in 0..MAX_SUBSTEPS {
            let remaining = target.diff(self.time);
            if remaining <= 0.0 {
                return PropagateResult::Complete;
            }
            let begin = self.time;
            let h = match self.step(remaining) {
                SubstepOutcome::Advanced(h) => h,
                SubstepOutcome::Breakdown => return PropagateResult::Breakdown,
            };
            let view = Substep {
                coeffs: self.ws.state_rows(),
                order: self.order,
                h,
                begin,
                end: self.time,
            };
            if sink(&view).is_break() {
                return PropagateResult::Halted;
            }
        }
        PropagateResult::Breakdown
    }

    /// Step size from the Jorba-Zou radius-of-convergence estimate,
    /// with coefficient norms scaled by the order-0 magnitudes.
    fn step_size(&self) -> f64 {
        let p = self.order;
        let mut m_last = 0.0f64;
        let mut m_prev = 0.0f64;
        for var in 0..NVARS {
            let scale = self.ws.get(var, 0).abs().max(1.0);
            m_last = m_last.max(self.ws.get(var, p).abs() / scale);
            m_prev = m_prev.max(self.ws.get(var, p - 1).abs() / scale);
        }
        let rho = match (m_prev > 0.0, m_last > 0.0) {
            (true, true) => m_prev
                .powf(-1.0 / (p - 1) as f64)
                .min(m_last.powf(-1.0 / p as f64)),
            (true, false) => m_prev.powf(-1.0 / (p - 1) as f64),
            (false, true) => m_last.powf(-1.0 / p as f64),
            (false, false) => return f64::INFINITY,
        };
        rho * STEP_SAFETY
    }
}
