//! Per-(chunk, particle) AABB and Morton code construction.
//!
//! For every chunk, each particle's trajectory segment is enclosed by
//! a conservative box: per overlapping substep, the Taylor polynomial
//! is translated to the sub-interval start and bounded by its
//! coefficient sums, then the box is enlarged by the particle radius
//! (plus half the conjunction threshold when conjunction screening is
//! enabled, so any pair within the threshold overlaps in the broad
//! phase).
//!
//! Every particle with trajectory data enters the geometry — whitelist
//! gating is a pair predicate applied downstream, so a non-whitelisted
//! particle must still be findable by a whitelisted partner. The
//! chunk-global box is reduced concurrently through per-lane atomics;
//! Morton codes are assigned in a second pass once the global extent
//! is known. Particles with no trajectory in the chunk (terminated
//! early) get the sentinel code and an empty box.

use rayon::prelude::*;

use kessler_dynamics::StepData;
use kessler_math::aabb::{Aabb, AtomicAabb};
use kessler_math::{morton, poly};

use crate::chunker::Chunker;

/// AABB, Morton code, and global-box storage for one superstep.
///
/// Row-major layout: entry `(c, p)` lives at `c * nparts + p`.
#[derive(Default)]
pub struct BboxBuffers {
    /// Per-(chunk, particle) boxes.
    pub aabbs: Vec<Aabb>,
    /// Per-(chunk, particle) Morton codes.
    pub mcodes: Vec<u64>,
    /// Per-chunk global boxes.
    pub global: Vec<Aabb>,
    nparts: usize,
}

/// Per-worker scratch for polynomial translation.
#[derive(Default)]
struct BboxScratch {
    tmp: Vec<f64>,
}

impl BboxBuffers {
    /// Boxes of one chunk.
    pub fn chunk_aabbs(&self, c: usize) -> &[Aabb] {
        &self.aabbs[c * self.nparts..(c + 1) * self.nparts]
    }

    /// Morton codes of one chunk.
    pub fn chunk_mcodes(&self, c: usize) -> &[u64] {
        &self.mcodes[c * self.nparts..(c + 1) * self.nparts]
    }

    /// Builds boxes and codes for every chunk.
    pub fn compute(&mut self, chunker: &Chunker, steps: &[StepData], conj_thresh: f64) {
        let nparts = steps.len();
        let nchunks = chunker.nchunks();
        self.nparts = nparts;
        self.aabbs.clear();
        self.aabbs.resize(nchunks * nparts, Aabb::EMPTY);
        self.mcodes.clear();
        self.mcodes.resize(nchunks * nparts, morton::SENTINEL);
        self.global.clear();

        let pad = 0.5 * conj_thresh.max(0.0);

        for c in 0..nchunks {
            let (t0, t1) = chunker.begin_end(c);
            let global = AtomicAabb::new();

            let boxes = &mut self.aabbs[c * nparts..(c + 1) * nparts];
            boxes
                .par_iter_mut()
                .enumerate()
                .for_each_init(BboxScratch::default, |scratch, (p, out)| {
                    if let Some(aabb) = particle_chunk_aabb(&steps[p], t0, t1, pad, scratch) {
                        *out = aabb;
                        global.include(&aabb);
                    }
                });

            let gsnap = global.load();
            let codes = &mut self.mcodes[c * nparts..(c + 1) * nparts];
            let boxes = &self.aabbs[c * nparts..(c + 1) * nparts];
            codes.par_iter_mut().zip(boxes).for_each(|(code, aabb)| {
                if aabb.is_valid() {
                    *code = morton::morton_code(
                        aabb.centroid(),
                        gsnap.spatial_lb(),
                        gsnap.spatial_ub(),
                    );
                }
            });

            self.global.push(gsnap);
        }
    }
}

/// Conservative box around one particle's trajectory within
/// `[t0, t1)`, or `None` when the trajectory does not reach the chunk.
fn particle_chunk_aabb(
    step: &StepData,
    t0: f64,
    t1: f64,
    pad: f64,
    scratch: &mut BboxScratch,
) -> Option<Aabb> {
    let horizon = t1.min(step.valid_until);
    if horizon <= t0 || step.n_substeps() == 0 {
        return None;
    }

    let mut lb = [f64::INFINITY; 4];
    let mut ub = [f64::NEG_INFINITY; 4];
    let mut seen = false;

    let first = step
        .tcoords
        .partition_point(|end| end.to_f64() <= t0);
    let radius = step.coeffs(0, 6)[0];

    for k in first..step.n_substeps() {
        let begin = step.substep_begin(k);
        let sub_start = begin.to_f64().max(t0);
        if sub_start >= horizon {
            break;
        }
        let sub_end = step.tcoords[k].to_f64().min(horizon);
        if sub_end <= sub_start {
            continue;
        }

        // Local sub-interval within the substep's Taylor variable.
        let tau_a = kessler_math::DDouble::new(sub_start).diff(begin);
        let width = sub_end - sub_start;

        for axis in 0..3 {
            scratch.tmp.clear();
            scratch.tmp.extend_from_slice(step.coeffs(k, axis));
            poly::translate(&mut scratch.tmp, tau_a);
            let (lo, hi) = poly::enclose(&scratch.tmp, width);
            lb[axis] = lb[axis].min(lo - radius - pad);
            ub[axis] = ub[axis].max(hi + radius + pad);
        }
        seen = true;
    }

    if !seen {
        return None;
    }

    // Radius lane: [0, r], so the lane never culls on its own but the
    // box record stays a uniform 4-float pair.
    lb[3] = 0.0;
    ub[3] = radius;

    Some(Aabb::from_f64_bounds(lb, ub))
}
