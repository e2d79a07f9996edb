//! Narrow-phase event extraction.
//!
//! For each candidate pair, the chunk interval is cut at every substep
//! boundary of either particle so that both trajectories are single
//! Taylor polynomials on each piece. On each piece the squared
//! distance `D` is composed in a normalized unit variable; collisions
//! are roots of `D - (r_i + r_j)^2`, conjunctions are minima of `D`
//! (sign-change roots of `D'`) below the threshold.
//!
//! One collision is reported per pair per chunk — the earliest root —
//! while every qualifying distance minimum is reported. A pair is
//! tested for a detection type when at least one participant is
//! active for it; with a non-empty whitelist, one listed member per
//! pair suffices.

use rayon::prelude::*;

use kessler_dynamics::StepData;
use kessler_math::{poly, DDouble};

use crate::events::{Collision, Conjunction};
use crate::roots::RootFinder;

/// Narrow-phase thresholds for one superstep.
#[derive(Debug, Clone, Copy)]
pub struct NarrowSettings {
    /// Conjunction distance threshold; 0 disables conjunctions.
    pub conj_thresh: f64,
    /// Minimum combined radius for a pair to be collision-tested.
    pub min_coll_radius: f64,
}

/// Per-worker scratch: the root-isolation engine plus polynomial
/// buffers reused across pairs.
#[derive(Default)]
struct NarrowScratch {
    rf: RootFinder,
    ti: [Vec<f64>; 3],
    tj: [Vec<f64>; 3],
    diff: Vec<f64>,
    dpoly: Vec<f64>,
    cpoly: Vec<f64>,
    dprime: Vec<f64>,
    isol: Vec<(f64, f64)>,
    collisions: Vec<Collision>,
    conjunctions: Vec<Conjunction>,
}

/// Runs the narrow phase over one chunk's candidate list.
pub fn narrow_phase(
    pairs: &[(u32, u32)],
    steps: &[StepData],
    chunk: (f64, f64),
    coll_active: &[bool],
    conj_active: &[bool],
    settings: NarrowSettings,
) -> (Vec<Collision>, Vec<Conjunction>) {
    pairs
        .par_iter()
        .fold(NarrowScratch::default, |mut scratch, &(i, j)| {
            process_pair(i, j, steps, chunk, coll_active, conj_active, settings, &mut scratch);
            scratch
        })
        .map(|scratch| (scratch.collisions, scratch.conjunctions))
        .reduce(
            || (Vec::new(), Vec::new()),
            |mut acc, (coll, conj)| {
                acc.0.extend(coll);
                acc.1.extend(conj);
                acc
            },
        )
}

#[allow(clippy::too_many_arguments)]
fn process_pair(
    i: u32,
    j: u32,
    steps: &[StepData],
    (t0, t1): (f64, f64),
    coll_active: &[bool],
    conj_active: &[bool],
    settings: NarrowSettings,
    scratch: &mut NarrowScratch,
) {
    let si = &steps[i as usize];
    let sj = &steps[j as usize];
    if si.n_substeps() == 0 || sj.n_substeps() == 0 {
        return;
    }

    let ri = si.coeffs(0, 6)[0];
    let rj = sj.coeffs(0, 6)[0];
    let test_coll = (coll_active[i as usize] || coll_active[j as usize])
        && ri + rj >= settings.min_coll_radius;
    let test_conj = (conj_active[i as usize] || conj_active[j as usize])
        && settings.conj_thresh > 0.0;
    if !test_coll && !test_conj {
        return;
    }

    let horizon = t1.min(si.valid_until).min(sj.valid_until);
    let rr2 = (ri + rj) * (ri + rj);
    let thresh2 = settings.conj_thresh * settings.conj_thresh;

    let mut ki = si.tcoords.partition_point(|end| end.to_f64() <= t0);
    let mut kj = sj.tcoords.partition_point(|end| end.to_f64() <= t0);
    let mut cursor = t0;
    let mut coll_found = false;

    while cursor < horizon && ki < si.n_substeps() && kj < sj.n_substeps() {
        let end_i = si.tcoords[ki].to_f64();
        let end_j = sj.tcoords[kj].to_f64();
        let seg_end = end_i.min(end_j).min(horizon);

        if seg_end > cursor {
            let width = seg_end - cursor;

            // Both trajectories, translated to the segment start and
            // rescaled to the unit variable.
            for axis in 0..3 {
                to_unit(si, ki, axis, cursor, width, &mut scratch.ti[axis]);
                to_unit(sj, kj, axis, cursor, width, &mut scratch.tj[axis]);
            }
            poly::sum_sq_diff3(
                [&scratch.ti[0], &scratch.ti[1], &scratch.ti[2]],
                [&scratch.tj[0], &scratch.tj[1], &scratch.tj[2]],
                &mut scratch.diff,
                &mut scratch.dpoly,
            );

            if test_coll && !coll_found {
                scratch.cpoly.clear();
                scratch.cpoly.extend_from_slice(&scratch.dpoly);
                scratch.cpoly[0] -= rr2;
                if let Some(x) = scratch.rf.earliest_root(&scratch.cpoly, &mut scratch.isol) {
                    scratch.collisions.push(Collision {
                        i,
                        j,
                        t: cursor + x * width,
                    });
                    coll_found = true;
                    if !test_conj {
                        return;
                    }
                }
            }

            if test_conj {
                poly::derivative(&scratch.dpoly, &mut scratch.dprime);
                scratch.rf.isolate(&scratch.dprime, &mut scratch.isol);
                for idx in 0..scratch.isol.len() {
                    let (a, b) = scratch.isol[idx];
                    // A minimum: D' crosses from negative to positive.
                    if poly::eval(&scratch.dprime, a) > 0.0
                        || poly::eval(&scratch.dprime, b) < 0.0
                    {
                        continue;
                    }
                    let x = scratch.rf.refine(&scratch.dprime, a, b);
                    let d2 = poly::eval(&scratch.dpoly, x);
                    if d2 <= thresh2 {
                        scratch.conjunctions.push(Conjunction {
                            i,
                            j,
                            t: cursor + x * width,
                            dist: d2.max(0.0).sqrt(),
                        });
                    }
                }
            }
        }

        if end_i <= seg_end {
            ki += 1;
        }
        if end_j <= seg_end {
            kj += 1;
        }
        cursor = seg_end;
    }
}

/// Copies the coefficients of `var` on substep `k`, translated so the
/// segment start maps to 0 and rescaled so the segment end maps to 1.
fn to_unit(step: &StepData, k: usize, var: usize, seg_start: f64, width: f64, out: &mut Vec<f64>) {
    out.clear();
    out.extend_from_slice(step.coeffs(k, var));
    let offset = DDouble::new(seg_start).diff(step.substep_begin(k));
    poly::translate(out, offset);
    poly::rescale(out, width);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kessler_math::DDouble;

    /// Linear motion record: x(t) = x0 + v t on [0, span].
    fn linear_step(x0: [f64; 3], v: [f64; 3], r: f64, span: f64) -> StepData {
        let mut data = StepData::default();
        data.reset(1, span);
        for axis in 0..3 {
            data.tcs.extend_from_slice(&[x0[axis], v[axis]]);
        }
        for axis in 0..3 {
            data.tcs.extend_from_slice(&[v[axis], 0.0]);
        }
        data.tcs.extend_from_slice(&[r, 0.0]);
        data.tcoords.push(DDouble::new(span));
        data
    }

    const SETTINGS: NarrowSettings = NarrowSettings {
        conj_thresh: 0.0,
        min_coll_radius: 0.0,
    };

    #[test]
    fn head_on_approach_collides_at_contact_time() {
        let steps = vec![
            linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0),
            linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
        ];
        let active = vec![true, true];
        let inactive = vec![false, false];
        let (coll, conj) = narrow_phase(
            &[(0, 1)],
            &steps,
            (0.0, 2.0),
            &active,
            &inactive,
            SETTINGS,
        );
        assert!(conj.is_empty());
        assert_eq!(coll.len(), 1);
        assert_eq!((coll[0].i, coll[0].j), (0, 1));
        // Gap 2 closes at rate 2; contact at (2 - 0.02) / 2.
        assert_relative_eq!(coll[0].t, 0.99, epsilon = 1e-9);
    }

    #[test]
    fn grazing_miss_reports_conjunction_only() {
        let steps = vec![
            linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0),
            linear_step([1.0, 0.03, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
        ];
        let active = vec![true, true];
        let (coll, conj) = narrow_phase(
            &[(0, 1)],
            &steps,
            (0.0, 2.0),
            &active,
            &active,
            NarrowSettings {
                conj_thresh: 0.05,
                min_coll_radius: 0.0,
            },
        );
        assert!(coll.is_empty());
        assert_eq!(conj.len(), 1);
        assert_relative_eq!(conj[0].t, 1.0, epsilon = 1e-9);
        assert_relative_eq!(conj[0].dist, 0.03, epsilon = 1e-9);
    }

    #[test]
    fn min_coll_radius_suppresses_small_pairs() {
        let steps = vec![
            linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0),
            linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
        ];
        let active = vec![true, true];
        let inactive = vec![false, false];
        let (coll, _) = narrow_phase(
            &[(0, 1)],
            &steps,
            (0.0, 2.0),
            &active,
            &inactive,
            NarrowSettings {
                conj_thresh: 0.0,
                min_coll_radius: 0.1,
            },
        );
        assert!(coll.is_empty(), "combined radius 0.02 is below the floor");
    }

    #[test]
    fn segment_walk_respects_substep_boundaries() {
        // Particle 0 records two substeps; the pair still collides at
        // the same physical time.
        let mut two_subs = StepData::default();
        two_subs.reset(1, 2.0);
        // Substep A: [0, 0.5], starts at x = -1.
        for (x0, v) in [(-1.0, 1.0), (0.0, 0.0), (0.0, 0.0)] {
            two_subs.tcs.extend_from_slice(&[x0, v]);
        }
        for v in [1.0, 0.0, 0.0] {
            two_subs.tcs.extend_from_slice(&[v, 0.0]);
        }
        two_subs.tcs.extend_from_slice(&[0.01, 0.0]);
        two_subs.tcoords.push(DDouble::new(0.5));
        // Substep B: [0.5, 2.0], starts at x = -0.5.
        for (x0, v) in [(-0.5, 1.0), (0.0, 0.0), (0.0, 0.0)] {
            two_subs.tcs.extend_from_slice(&[x0, v]);
        }
        for v in [1.0, 0.0, 0.0] {
            two_subs.tcs.extend_from_slice(&[v, 0.0]);
        }
        two_subs.tcs.extend_from_slice(&[0.01, 0.0]);
        two_subs.tcoords.push(DDouble::new(2.0));

        let steps = vec![
            two_subs,
            linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
        ];
        let active = vec![true, true];
        let inactive = vec![false, false];
        let (coll, _) = narrow_phase(
            &[(0, 1)],
            &steps,
            (0.0, 2.0),
            &active,
            &inactive,
            SETTINGS,
        );
        assert_eq!(coll.len(), 1);
        assert_relative_eq!(coll[0].t, 0.99, epsilon = 1e-9);
    }

    #[test]
    fn terminated_trajectory_limits_the_search() {
        let mut early_stop = linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0);
        early_stop.valid_until = 0.5; // gone before contact
        let steps = vec![
            early_stop,
            linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
        ];
        let active = vec![true, true];
        let inactive = vec![false, false];
        let (coll, _) = narrow_phase(
            &[(0, 1)],
            &steps,
            (0.0, 2.0),
            &active,
            &inactive,
            SETTINGS,
        );
        assert!(coll.is_empty());
    }
}
