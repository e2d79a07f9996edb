//! Superstep propagation with terminal-event detection.
//!
//! One worker per particle: borrow an integrator from the pool,
//! propagate across the superstep, and record every accepted substep
//! into the particle's [`StepData`]. After each substep the freshly
//! produced Taylor polynomials are inspected for terminal conditions —
//! reentry-surface crossing, exit-radius crossing, non-finite
//! coefficients — with sub-substep precision, halting the particle's
//! propagation on the first hit.

use std::ops::ControlFlow;

use rayon::prelude::*;

use kessler_detect::{RootFinder, TerminalEvent};
use kessler_dynamics::{IntegratorPool, PropagateResult, StepData, Substep};
use kessler_math::poly;
use kessler_types::constants::NVARS;
use kessler_types::TerminalCode;

use crate::config::ReentryRadius;

/// Terminal surfaces checked during propagation.
#[derive(Debug, Clone, Copy)]
pub struct Surfaces {
    /// Reentry surface, if any.
    pub reentry: ReentryRadius,
    /// Exit radius; 0 disables.
    pub exit_radius: f64,
}

/// Result of propagating every particle across one superstep.
pub struct PropagationOutput {
    /// Per-particle state at the end of its propagation (the superstep
    /// end, or frozen at the terminal-event time).
    pub end_states: Vec<[f64; NVARS]>,
    /// Terminal events, in particle order.
    pub terminals: Vec<TerminalEvent>,
}

/// Per-worker scratch for terminal-surface root finding.
#[derive(Default)]
struct TerminalScratch {
    rf: RootFinder,
    axis: Vec<f64>,
    gpoly: Vec<f64>,
    isol: Vec<(f64, f64)>,
}

/// Propagates all particles, filling `steps` (resized to the particle
/// count) with this superstep's trajectory records.
pub fn propagate_superstep(
    pool: &IntegratorPool,
    state: &[f64],
    pars: &[f64],
    npars: usize,
    delta_t: f64,
    surfaces: Surfaces,
    steps: &mut Vec<StepData>,
) -> PropagationOutput {
    let nparts = state.len() / NVARS;
    steps.resize_with(nparts, StepData::default);

    let results: Vec<(Option<TerminalEvent>, [f64; NVARS])> = steps
        .par_iter_mut()
        .enumerate()
        .map_init(TerminalScratch::default, |scratch, (p, step)| {
            let initial: [f64; NVARS] =
                state[p * NVARS..(p + 1) * NVARS].try_into().expect("state row");
            let par_row = &pars[p * npars..(p + 1) * npars];

            let mut ta = pool.acquire();
            ta.set_conditions(initial, par_row, kessler_math::DDouble::ZERO);
            step.reset(ta.order(), delta_t);

            let mut terminal: Option<TerminalEvent> = None;
            let result = ta.propagate_until(delta_t, |sub| {
                step.record(sub);
                if let Some((t, code)) = check_terminal(sub, surfaces, scratch) {
                    terminal = Some(TerminalEvent {
                        particle: p as u32,
                        t,
                        code,
                    });
                    step.valid_until = t;
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            });

            match result {
                PropagateResult::Complete => (None, *ta.state()),
                PropagateResult::Halted => {
                    let t = terminal.as_ref().map(|e| e.t).unwrap_or(delta_t);
                    let mut frozen = initial;
                    step.eval_state(t, &mut frozen);
                    (terminal, frozen)
                }
                PropagateResult::Breakdown => {
                    let t = ta.time().to_f64().min(delta_t);
                    step.valid_until = t;
                    let mut frozen = initial;
                    step.eval_state(t, &mut frozen);
                    (
                        Some(TerminalEvent {
                            particle: p as u32,
                            t,
                            code: TerminalCode::NonFinite,
                        }),
                        frozen,
                    )
                }
            }
        })
        .collect();

    let mut output = PropagationOutput {
        end_states: Vec::with_capacity(nparts),
        terminals: Vec::new(),
    };
    for (terminal, end_state) in results {
        output.end_states.push(end_state);
        output.terminals.extend(terminal);
    }
    output
}

/// Inspects one substep's polynomials for the earliest terminal
/// condition within it.
fn check_terminal(
    sub: &Substep<'_>,
    surfaces: Surfaces,
    scratch: &mut TerminalScratch,
) -> Option<(f64, TerminalCode)> {
    if sub.coeffs.iter().any(|c| !c.is_finite()) {
        return Some((sub.begin.to_f64(), TerminalCode::NonFinite));
    }

    let begin = sub.begin.to_f64();
    let mut best: Option<(f64, TerminalCode)> = None;
    let mut consider = |t: f64, code: TerminalCode, best: &mut Option<(f64, TerminalCode)>| {
        if best.map_or(true, |(bt, _)| t < bt) {
            *best = Some((t, code));
        }
    };

    if let Some(axes) = surfaces.reentry.semiaxes() {
        // g(x) = sum_axis (p_axis(h x) / a_axis)^2 - 1 on the unit
        // interval; a crossing is a root, being inside at the substep
        // start is an immediate hit.
        radial_poly(sub, Some(axes), scratch);
        scratch.gpoly[0] -= 1.0;
        if scratch.gpoly[0] <= 0.0 {
            consider(begin, TerminalCode::Reentry, &mut best);
        } else if let Some(x) = scratch.rf.earliest_root(&scratch.gpoly, &mut scratch.isol) {
            consider(begin + x * sub.h, TerminalCode::Reentry, &mut best);
        }
    }

    if surfaces.exit_radius > 0.0 {
        radial_poly(sub, None, scratch);
        scratch.gpoly[0] -= surfaces.exit_radius * surfaces.exit_radius;
        if scratch.gpoly[0] >= 0.0 {
            consider(begin, TerminalCode::Exit, &mut best);
        } else if let Some(x) = scratch.rf.earliest_root(&scratch.gpoly, &mut scratch.isol) {
            consider(begin + x * sub.h, TerminalCode::Exit, &mut best);
        }
    }

    best
}

/// Builds `sum_axis (p_axis(h x) / a_axis)^2` into `scratch.gpoly`
/// (unit semiaxes when `axes` is `None`).
fn radial_poly(sub: &Substep<'_>, axes: Option<[f64; 3]>, scratch: &mut TerminalScratch) {
    let len = sub.order + 1;
    scratch.gpoly.clear();
    scratch.gpoly.resize(2 * len - 1, 0.0);
    for axis in 0..3 {
        scratch.axis.clear();
        scratch.axis.extend_from_slice(sub.var(axis));
        poly::rescale(&mut scratch.axis, sub.h);
        if let Some(axes) = axes {
            let inv = 1.0 / axes[axis];
            for c in &mut scratch.axis {
                *c *= inv;
            }
        }
        poly::mul_acc(&scratch.axis, &scratch.axis, &mut scratch.gpoly);
    }
}
