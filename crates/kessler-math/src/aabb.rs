//! 4-lane axis-aligned bounding boxes.
//!
//! The first three lanes are spatial; the fourth carries the particle
//! radius so the per-particle box data stays a SIMD-friendly 4-float
//! record. Radius intervals are `[0, r]`, so the fourth lane never
//! culls a pair on its own.
//!
//! Bounds are stored as `f32`, widened by one ULP when narrowing from
//! the `f64` trajectory data so the box always encloses the exact
//! values. The chunk-global box is reduced concurrently through
//! [`AtomicAabb`], whose lanes are `AtomicU32` bit-casts of `f32` —
//! Rust atomics already carry the alignment lock-free access needs.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::DVec3;

/// A 4-lane AABB: lanes x, y, z, radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Lower bounds.
    pub lb: [f32; 4],
    /// Upper bounds.
    pub ub: [f32; 4],
}

impl Aabb {
    /// The empty box: `+inf` lower bounds, `-inf` upper bounds.
    /// Merging anything into it yields the other operand.
    pub const EMPTY: Aabb = Aabb {
        lb: [f32::INFINITY; 4],
        ub: [f32::NEG_INFINITY; 4],
    };

    /// Narrows `f64` bounds to `f32`, widening each bound outward by
    /// one ULP so the result still encloses the input interval.
    pub fn from_f64_bounds(lb: [f64; 4], ub: [f64; 4]) -> Self {
        let mut out = Aabb::EMPTY;
        for lane in 0..4 {
            out.lb[lane] = (lb[lane] as f32).next_down();
            out.ub[lane] = (ub[lane] as f32).next_up();
        }
        out
    }

    /// True when the box contains at least one point.
    pub fn is_valid(&self) -> bool {
        (0..4).all(|lane| self.lb[lane] <= self.ub[lane])
    }

    /// Componentwise union.
    pub fn merge(&mut self, other: &Aabb) {
        for lane in 0..4 {
            self.lb[lane] = self.lb[lane].min(other.lb[lane]);
            self.ub[lane] = self.ub[lane].max(other.ub[lane]);
        }
    }

    /// Overlap test over all four lanes. The radius lane (`[0, r]` on
    /// both sides) always overlaps, keeping the test branch-free per
    /// lane.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..4).all(|lane| self.lb[lane] <= other.ub[lane] && other.lb[lane] <= self.ub[lane])
    }

    /// Centroid of the spatial lanes.
    pub fn centroid(&self) -> DVec3 {
        DVec3::new(
            0.5 * (self.lb[0] as f64 + self.ub[0] as f64),
            0.5 * (self.lb[1] as f64 + self.ub[1] as f64),
            0.5 * (self.lb[2] as f64 + self.ub[2] as f64),
        )
    }

    /// Spatial lower corner.
    pub fn spatial_lb(&self) -> DVec3 {
        DVec3::new(self.lb[0] as f64, self.lb[1] as f64, self.lb[2] as f64)
    }

    /// Spatial upper corner.
    pub fn spatial_ub(&self) -> DVec3 {
        DVec3::new(self.ub[0] as f64, self.ub[1] as f64, self.ub[2] as f64)
    }

    /// True when `other` is contained in `self` on every lane.
    pub fn contains(&self, other: &Aabb) -> bool {
        (0..4).all(|lane| self.lb[lane] <= other.lb[lane] && other.ub[lane] <= self.ub[lane])
    }
}

/// One atomically-updatable `f32` lane, stored as its bit pattern.
struct AtomicF32Lane(AtomicU32);

impl AtomicF32Lane {
    fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Lock-free `min` via compare-exchange on the float value.
    fn fetch_min(&self, v: f32) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            (v < f32::from_bits(bits)).then(|| v.to_bits())
        });
    }

    fn fetch_max(&self, v: f32) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            (v > f32::from_bits(bits)).then(|| v.to_bits())
        });
    }
}

/// A 4-lane AABB reduced concurrently by many writers.
///
/// Used for the per-chunk global box: every worker that finishes a
/// particle box folds it in with per-lane atomic min/max.
pub struct AtomicAabb {
    lb: [AtomicF32Lane; 4],
    ub: [AtomicF32Lane; 4],
}

impl AtomicAabb {
    /// Creates an empty atomic box.
    pub fn new() -> Self {
        Self {
            lb: std::array::from_fn(|_| AtomicF32Lane::new(f32::INFINITY)),
            ub: std::array::from_fn(|_| AtomicF32Lane::new(f32::NEG_INFINITY)),
        }
    }

    /// Resets to the empty box (single-writer context only).
    pub fn reset(&self) {
        for lane in 0..4 {
            self.lb[lane].store(f32::INFINITY);
            self.ub[lane].store(f32::NEG_INFINITY);
        }
    }

    /// Folds `aabb` into the global box.
    pub fn include(&self, aabb: &Aabb) {
        for lane in 0..4 {
            self.lb[lane].fetch_min(aabb.lb[lane]);
            self.ub[lane].fetch_max(aabb.ub[lane]);
        }
    }

    /// Snapshot of the current bounds.
    pub fn load(&self) -> Aabb {
        Aabb {
            lb: std::array::from_fn(|lane| self.lb[lane].load()),
            ub: std::array::from_fn(|lane| self.ub[lane].load()),
        }
    }
}

impl Default for AtomicAabb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(lb: [f32; 4], ub: [f32; 4]) -> Aabb {
        Aabb { lb, ub }
    }

    #[test]
    fn empty_merges_to_identity() {
        let mut e = Aabb::EMPTY;
        let b = boxed([0.0; 4], [1.0; 4]);
        e.merge(&b);
        assert_eq!(e, b);
    }

    #[test]
    fn overlap_is_symmetric_and_tight() {
        let a = boxed([0.0, 0.0, 0.0, 0.0], [1.0, 1.0, 1.0, 0.1]);
        let b = boxed([1.0, 0.5, 0.5, 0.0], [2.0, 2.0, 2.0, 0.2]);
        let c = boxed([1.1, 0.5, 0.5, 0.0], [2.0, 2.0, 2.0, 0.2]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn f64_narrowing_is_conservative() {
        let v = 0.1f64; // not representable in f32
        let b = Aabb::from_f64_bounds([v; 4], [v; 4]);
        for lane in 0..4 {
            assert!((b.lb[lane] as f64) < v);
            assert!((b.ub[lane] as f64) > v);
        }
    }

    #[test]
    fn atomic_reduction_matches_sequential() {
        use std::sync::Arc;

        let global = Arc::new(AtomicAabb::new());
        let boxes: Vec<Aabb> = (0..64)
            .map(|i| {
                let f = i as f32;
                boxed([f, -f, f * 0.5, 0.0], [f + 1.0, -f + 1.0, f * 0.5 + 1.0, 0.01])
            })
            .collect();

        std::thread::scope(|scope| {
            for chunk in boxes.chunks(8) {
                let global = Arc::clone(&global);
                scope.spawn(move || {
                    for b in chunk {
                        global.include(b);
                    }
                });
            }
        });

        let mut expect = Aabb::EMPTY;
        for b in &boxes {
            expect.merge(b);
        }
        assert_eq!(global.load(), expect);
    }
}
