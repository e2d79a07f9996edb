//! The per-superstep detection pipeline.
//!
//! Owns the inter-phase buffers (boxes, sorted views, trees) so a
//! simulation reuses their allocations across supersteps. Phases are
//! separated by the joins of successive parallel passes; no phase
//! reads data another phase is still writing.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use kessler_dynamics::StepData;

use crate::bboxes::BboxBuffers;
use crate::broad::broad_phase;
use crate::bvh::BvhTree;
use crate::chunker::Chunker;
use crate::events::{Collision, Conjunction};
use crate::narrow::{narrow_phase, NarrowSettings};
use crate::sorter::SortBuffers;

/// Pipeline configuration for one superstep.
#[derive(Debug, Clone, Copy)]
pub struct DetectionSettings {
    /// Superstep width.
    pub delta_t: f64,
    /// Number of chunks the superstep is cut into.
    pub nchunks: usize,
    /// Conjunction distance threshold; 0 disables conjunctions.
    pub conj_thresh: f64,
    /// Minimum combined radius for collision testing.
    pub min_coll_radius: f64,
}

/// Wall-clock seconds spent in each phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub bboxes: f64,
    pub sort: f64,
    pub bvh: f64,
    pub broad: f64,
    pub narrow: f64,
}

/// Everything one superstep's detection produced.
#[derive(Debug, Default)]
pub struct DetectionReport {
    /// Collisions across all chunks, unsorted.
    pub collisions: Vec<Collision>,
    /// Conjunctions, one vector per chunk.
    pub conjunctions: Vec<Vec<Conjunction>>,
    /// Total broad-phase candidate pairs.
    pub candidate_pairs: usize,
    /// Per-phase timings.
    pub timings: PhaseTimings,
}

/// The detection pipeline with its reusable buffers.
#[derive(Default)]
pub struct DetectionPipeline {
    bbox: BboxBuffers,
    sorted: SortBuffers,
    trees: Vec<BvhTree>,
}

impl DetectionPipeline {
    /// Runs all five phases for one superstep.
    pub fn run(
        &mut self,
        steps: &[StepData],
        coll_active: &[bool],
        conj_active: &[bool],
        settings: DetectionSettings,
    ) -> DetectionReport {
        let nparts = steps.len();
        let chunker = Chunker::new(settings.delta_t, settings.nchunks);
        let nchunks = chunker.nchunks();
        let mut report = DetectionReport::default();
        let mut timings = PhaseTimings::default();

        // AABB / Morton build. Every particle with trajectory data
        // participates; whitelist gating happens per pair downstream.
        let mark = Instant::now();
        self.bbox.compute(&chunker, steps, settings.conj_thresh);
        timings.bboxes = mark.elapsed().as_secs_f64();

        // Indirect sort.
        let mark = Instant::now();
        self.sorted.compute(&self.bbox, nchunks, nparts);
        timings.sort = mark.elapsed().as_secs_f64();

        // BVH build, one tree per chunk.
        let mark = Instant::now();
        self.trees.resize_with(nchunks, BvhTree::default);
        let sorted = &self.sorted;
        self.trees.par_iter_mut().enumerate().for_each(|(c, tree)| {
            let n = sorted.n_active[c];
            tree.build(&sorted.chunk_mcodes(c)[..n], &sorted.chunk_aabbs(c)[..n]);
        });
        timings.bvh = mark.elapsed().as_secs_f64();

        // Broad phase.
        let mark = Instant::now();
        let candidates: Vec<Vec<(u32, u32)>> = (0..nchunks)
            .map(|c| broad_phase(&self.trees[c], &self.sorted, c, coll_active, conj_active))
            .collect();
        report.candidate_pairs = candidates.iter().map(Vec::len).sum();
        timings.broad = mark.elapsed().as_secs_f64();

        // Narrow phase.
        let mark = Instant::now();
        let narrow = NarrowSettings {
            conj_thresh: settings.conj_thresh,
            min_coll_radius: settings.min_coll_radius,
        };
        report.conjunctions = Vec::with_capacity(nchunks);
        for (c, pairs) in candidates.iter().enumerate() {
            let (coll, conj) = narrow_phase(
                pairs,
                steps,
                chunker.begin_end(c),
                coll_active,
                conj_active,
                narrow,
            );
            report.collisions.extend(coll);
            report.conjunctions.push(conj);
        }
        timings.narrow = mark.elapsed().as_secs_f64();

        debug!(
            nparts,
            nchunks,
            candidates = report.candidate_pairs,
            collisions = report.collisions.len(),
            "detection pipeline complete"
        );
        report.timings = timings;
        report
    }
}
