//! Real-root isolation on the unit interval.
//!
//! The narrow phase reduces every question it asks — "when do these
//! two particles touch", "where is the distance minimum" — to the
//! roots of a polynomial on `(0, 1)`. Isolation is recursive
//! subdivision driven by the Descartes bound of the interval's
//! Moebius-transformed polynomial: a bound of 0 discards the interval,
//! 1 isolates a single root (the bound matches the root count's
//! parity), anything else splits the interval in half.
//!
//! Subdivision churns through coefficient vectors, so they come from a
//! cache and travel inside [`PolyGuard`] handles that return their
//! vector on drop — on every exit path. The working list holding the
//! guards is a local of each call, so it always dies before the cache
//! it borrows from.

use std::cell::RefCell;

use kessler_math::poly;
use kessler_types::constants::ROOT_REFINE_EPS;

/// Bisection iteration cap; the interval width floor is reached first
/// on any sane input.
const MAX_BISECT_ITERS: u32 = 80;

/// A cached coefficient vector, returned to its cache on drop.
struct PolyGuard<'a> {
    cache: &'a RefCell<Vec<Vec<f64>>>,
    v: Vec<f64>,
}

impl<'a> PolyGuard<'a> {
    fn from_slice(cache: &'a RefCell<Vec<Vec<f64>>>, src: &[f64]) -> Self {
        let mut v = cache.borrow_mut().pop().unwrap_or_default();
        v.clear();
        v.extend_from_slice(src);
        Self { cache, v }
    }
}

impl Drop for PolyGuard<'_> {
    fn drop(&mut self) {
        self.cache.borrow_mut().push(std::mem::take(&mut self.v));
    }
}

/// Reusable real-root isolation engine (one per worker).
#[derive(Default)]
pub struct RootFinder {
    cache: RefCell<Vec<Vec<f64>>>,
    scratch: RefCell<Vec<f64>>,
}

impl RootFinder {
    /// Isolates the roots of `p` in `(0, 1)`: fills `out` with
    /// disjoint intervals each containing exactly one root (or a root
    /// cluster narrower than the refinement floor).
    pub fn isolate(&self, p: &[f64], out: &mut Vec<(f64, f64)>) {
        out.clear();
        let mut scratch = self.scratch.borrow_mut();

        // Working list of (lb, ub, interval polynomial) in unit
        // coordinates. Guards return their vectors as entries pop.
        let mut wlist = vec![(0.0f64, 1.0f64, PolyGuard::from_slice(&self.cache, p))];
        while let Some((lb, ub, guard)) = wlist.pop() {
            match poly::unit_root_bound(&guard.v, &mut scratch) {
                0 => {}
                1 => out.push((lb, ub)),
                _ if ub - lb < ROOT_REFINE_EPS => {
                    // Multiple sign changes in a vanishing interval:
                    // treat as a root cluster.
                    out.push((lb, ub));
                }
                _ => {
                    let mid = 0.5 * (lb + ub);
                    // An exact root on the cut would be an excluded
                    // endpoint of both halves; claim it here.
                    if poly::eval(&guard.v, 0.5) == 0.0 {
                        out.push((mid, mid));
                    }
                    // Left half: q(x/2); right half: q((x + 1)/2).
                    let mut left = PolyGuard::from_slice(&self.cache, &guard.v);
                    poly::rescale(&mut left.v, 0.5);
                    let mut right = PolyGuard::from_slice(&self.cache, &left.v);
                    poly::translate(&mut right.v, 1.0);
                    wlist.push((lb, mid, left));
                    wlist.push((mid, ub, right));
                }
            }
        }
    }

    /// Refines an isolating interval to a root of `p` by bisection.
    ///
    /// Falls back to the interval midpoint when the endpoint signs
    /// agree (an even-multiplicity cluster).
    pub fn refine(&self, p: &[f64], lb: f64, ub: f64) -> f64 {
        let mut a = lb;
        let mut b = ub;
        let fa = poly::eval(p, a);
        if fa == 0.0 {
            return a;
        }
        let fb = poly::eval(p, b);
        // A zero at the far endpoint belongs to the neighbouring
        // interval; the isolated root is interior, on the far side of
        // a sign change from `a`.
        let sb = if fb == 0.0 { -fa.signum() } else { fb.signum() };
        if fa.signum() == sb {
            return 0.5 * (a + b);
        }
        for _ in 0..MAX_BISECT_ITERS {
            if b - a < ROOT_REFINE_EPS {
                break;
            }
            let mid = 0.5 * (a + b);
            let fm = poly::eval(p, mid);
            if fm == 0.0 {
                return mid;
            }
            if fm.signum() == fa.signum() {
                a = mid;
            } else {
                b = mid;
            }
        }
        0.5 * (a + b)
    }

    /// Smallest root of `p` in `(0, 1)`, if any.
    pub fn earliest_root(&self, p: &[f64], isol: &mut Vec<(f64, f64)>) -> Option<f64> {
        self.isolate(p, isol);
        isol.iter()
            .map(|&(lb, ub)| self.refine(p, lb, ub))
            .min_by(f64::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn roots_of(p: &[f64]) -> Vec<f64> {
        let rf = RootFinder::default();
        let mut isol = Vec::new();
        rf.isolate(p, &mut isol);
        let mut roots: Vec<f64> = isol.iter().map(|&(a, b)| rf.refine(p, a, b)).collect();
        roots.sort_by(f64::total_cmp);
        roots
    }

    #[test]
    fn linear_root() {
        let roots = roots_of(&[-0.3, 1.0]);
        assert_eq!(roots.len(), 1);
        assert_relative_eq!(roots[0], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn well_separated_quadratic_roots() {
        // (x - 0.2)(x - 0.8) = 0.16 - x + x^2
        let roots = roots_of(&[0.16, -1.0, 1.0]);
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(roots[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn close_roots_are_separated() {
        // Roots at 0.5 +- 1e-4.
        let (r1, r2) = (0.4999, 0.5001);
        let p = [r1 * r2, -(r1 + r2), 1.0];
        let roots = roots_of(&p);
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], r1, epsilon = 1e-10);
        assert_relative_eq!(roots[1], r2, epsilon = 1e-10);
    }

    #[test]
    fn no_roots_means_empty() {
        assert!(roots_of(&[0.5, 0.0, 1.0]).is_empty());
        // Roots outside the unit interval don't count.
        assert!(roots_of(&[-2.0, 1.0]).is_empty());
    }

    #[test]
    fn quintic_with_three_unit_roots() {
        // (x - 0.1)(x - 0.5)(x - 0.9)(x - 2)(x + 1), expanded.
        let factors = [0.1, 0.5, 0.9, 2.0, -1.0];
        let mut p = vec![1.0];
        for r in factors {
            let mut q = vec![0.0; p.len() + 1];
            for (k, &c) in p.iter().enumerate() {
                q[k] -= r * c;
                q[k + 1] += c;
            }
            p = q;
        }
        let roots = roots_of(&p);
        assert_eq!(roots.len(), 3);
        for (found, expect) in roots.iter().zip([0.1, 0.5, 0.9]) {
            assert_relative_eq!(found, &expect, epsilon = 1e-10);
        }
    }

    #[test]
    fn interior_root_wins_over_endpoint_root() {
        // 3(3x - 1)(x - 1): roots at 1/3 (interior) and exactly 1.0
        // (an excluded endpoint). The interior root must be returned.
        let p = [3.0, -12.0, 9.0];
        let rf = RootFinder::default();
        let mut isol = Vec::new();
        let earliest = rf.earliest_root(&p, &mut isol).unwrap();
        assert_relative_eq!(earliest, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn earliest_root_picks_the_smallest() {
        let rf = RootFinder::default();
        let mut isol = Vec::new();
        let p = [0.16, -1.0, 1.0];
        let earliest = rf.earliest_root(&p, &mut isol).unwrap();
        assert_relative_eq!(earliest, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn cache_is_reused_across_calls() {
        let rf = RootFinder::default();
        let mut isol = Vec::new();
        rf.isolate(&[0.16, -1.0, 1.0], &mut isol);
        let cached = rf.cache.borrow().len();
        assert!(cached > 0, "subdivision should have parked vectors");
        rf.isolate(&[-0.3, 1.0], &mut isol);
        assert!(rf.cache.borrow().len() >= cached);
    }
}
