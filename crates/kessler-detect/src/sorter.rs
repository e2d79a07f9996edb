//! Indirect Morton sort.
//!
//! For each chunk, produces the permutation `vidx` ordering particles
//! by Morton code (stable, so equal codes keep index order), and
//! materializes code- and box-views in sorted order for cache-friendly
//! BVH construction. Sentinel codes sort to the end; `n_active` marks
//! the cutoff.

use rayon::prelude::*;

use kessler_math::aabb::Aabb;
use kessler_math::morton::SENTINEL;

use crate::bboxes::BboxBuffers;

/// Sorted views of the per-chunk AABB/Morton data.
#[derive(Default)]
pub struct SortBuffers {
    /// Per-chunk particle permutation: `mcodes[vidx[k]]` is
    /// non-decreasing in `k`.
    pub vidx: Vec<u32>,
    /// Boxes in sorted order.
    pub srt_aabbs: Vec<Aabb>,
    /// Codes in sorted order.
    pub srt_mcodes: Vec<u64>,
    /// Per-chunk count of particles with real (non-sentinel) codes.
    pub n_active: Vec<usize>,
    nparts: usize,
}

impl SortBuffers {
    /// Sorted permutation of one chunk.
    pub fn chunk_vidx(&self, c: usize) -> &[u32] {
        &self.vidx[c * self.nparts..(c + 1) * self.nparts]
    }

    /// Sorted boxes of one chunk.
    pub fn chunk_aabbs(&self, c: usize) -> &[Aabb] {
        &self.srt_aabbs[c * self.nparts..(c + 1) * self.nparts]
    }

    /// Sorted codes of one chunk.
    pub fn chunk_mcodes(&self, c: usize) -> &[u64] {
        &self.srt_mcodes[c * self.nparts..(c + 1) * self.nparts]
    }

    /// Sorts every chunk of `bbox`.
    pub fn compute(&mut self, bbox: &BboxBuffers, nchunks: usize, nparts: usize) {
        self.nparts = nparts;
        self.vidx.clear();
        self.vidx.resize(nchunks * nparts, 0);
        self.srt_aabbs.clear();
        self.srt_aabbs.resize(nchunks * nparts, Aabb::EMPTY);
        self.srt_mcodes.clear();
        self.srt_mcodes.resize(nchunks * nparts, SENTINEL);

        self.vidx
            .par_chunks_mut(nparts.max(1))
            .zip(self.srt_aabbs.par_chunks_mut(nparts.max(1)))
            .zip(self.srt_mcodes.par_chunks_mut(nparts.max(1)))
            .enumerate()
            .for_each(|(c, ((vidx, srt_aabbs), srt_mcodes))| {
                let codes = bbox.chunk_mcodes(c);
                let aabbs = bbox.chunk_aabbs(c);

                for (k, slot) in vidx.iter_mut().enumerate() {
                    *slot = k as u32;
                }
                vidx.sort_by_key(|&p| codes[p as usize]);

                for (k, &p) in vidx.iter().enumerate() {
                    srt_aabbs[k] = aabbs[p as usize];
                    srt_mcodes[k] = codes[p as usize];
                }
            });

        self.n_active = (0..nchunks)
            .map(|c| self.chunk_mcodes(c).partition_point(|&code| code < SENTINEL))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunker;
    use kessler_dynamics::StepData;
    use kessler_math::DDouble;

    fn still_particle(x: f64, r: f64) -> StepData {
        let mut data = StepData::default();
        data.reset(1, 1.0);
        data.tcs.extend_from_slice(&[x, 0.0]);
        for _ in 0..5 {
            data.tcs.extend_from_slice(&[0.0, 0.0]);
        }
        data.tcs.extend_from_slice(&[r, 0.0]);
        data.tcoords.push(DDouble::new(1.0));
        data
    }

    #[test]
    fn sorted_codes_are_non_decreasing_and_vidx_is_permutation() {
        // Deliberately reversed positions so the identity order is wrong.
        let steps: Vec<StepData> = (0..16)
            .map(|i| still_particle(15.0 - i as f64, 0.1))
            .collect();
        let chunker = Chunker::new(1.0, 1);

        let mut bbox = BboxBuffers::default();
        bbox.compute(&chunker, &steps, 0.0);
        let mut sorted = SortBuffers::default();
        sorted.compute(&bbox, 1, 16);

        let codes = sorted.chunk_mcodes(0);
        assert!(codes.windows(2).all(|w| w[0] <= w[1]));

        let mut seen = sorted.chunk_vidx(0).to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<u32>>());

        // Reverse-applying vidx recovers the original arrays.
        for (k, &p) in sorted.chunk_vidx(0).iter().enumerate() {
            assert_eq!(sorted.chunk_mcodes(0)[k], bbox.chunk_mcodes(0)[p as usize]);
            assert_eq!(sorted.chunk_aabbs(0)[k], bbox.chunk_aabbs(0)[p as usize]);
        }

        assert_eq!(sorted.n_active[0], 16);
    }

    #[test]
    fn sentinels_sort_to_the_end() {
        let mut steps: Vec<StepData> = (0..4).map(|i| still_particle(i as f64, 0.1)).collect();
        // Particles 1 and 3 terminated before the superstep began.
        steps[1].valid_until = 0.0;
        steps[3].valid_until = 0.0;
        let chunker = Chunker::new(1.0, 1);

        let mut bbox = BboxBuffers::default();
        bbox.compute(&chunker, &steps, 0.0);
        let mut sorted = SortBuffers::default();
        sorted.compute(&bbox, 1, 4);

        assert_eq!(sorted.n_active[0], 2);
        let codes = sorted.chunk_mcodes(0);
        assert!(codes[0] < SENTINEL && codes[1] < SENTINEL);
        assert_eq!(codes[2], SENTINEL);
        assert_eq!(codes[3], SENTINEL);
    }
}
