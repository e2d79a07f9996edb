//! Broad-phase candidate pair search.
//!
//! Every particle traverses its chunk's BVH with an explicit stack,
//! collecting leaves whose boxes overlap its own. A pair is emitted
//! only from the lower original index (`q > p`), so each unordered
//! pair appears exactly once per chunk, and only when at least one
//! participant is active for some detection type — whitelists demand
//! one member per pair, not two.
//!
//! Workers keep thread-local pair lists and traversal stacks (rayon
//! fold state), concatenated at the phase barrier.

use rayon::prelude::*;

use crate::bvh::BvhTree;
use crate::sorter::SortBuffers;

/// Per-worker traversal state: a pair list and a reusable stack.
#[derive(Default)]
struct BroadScratch {
    pairs: Vec<(u32, u32)>,
    stack: Vec<i32>,
}

/// Finds all candidate pairs of chunk `c` whose AABBs overlap and
/// where at least one participant is active for a detection type.
pub fn broad_phase(
    tree: &BvhTree,
    sorted: &SortBuffers,
    c: usize,
    coll_active: &[bool],
    conj_active: &[bool],
) -> Vec<(u32, u32)> {
    if tree.is_empty() {
        return Vec::new();
    }
    let n_active = sorted.n_active[c];
    let vidx = sorted.chunk_vidx(c);
    let aabbs = sorted.chunk_aabbs(c);

    (0..n_active)
        .into_par_iter()
        .fold(BroadScratch::default, |mut scratch, k| {
            let p = vidx[k] as usize;
            let pbox = &aabbs[k];

            scratch.stack.clear();
            scratch.stack.push(0);
            while let Some(idx) = scratch.stack.pop() {
                let node = &tree.nodes[idx as usize];
                if !node.aabb.overlaps(pbox) {
                    continue;
                }
                if node.is_leaf() {
                    let q = vidx[node.begin as usize] as usize;
                    if q > p
                        && (coll_active[p]
                            || coll_active[q]
                            || conj_active[p]
                            || conj_active[q])
                    {
                        scratch.pairs.push((p as u32, q as u32));
                    }
                } else {
                    scratch.stack.push(node.left);
                    scratch.stack.push(node.right);
                }
            }
            scratch
        })
        .map(|scratch| scratch.pairs)
        .reduce(Vec::new, |mut acc, pairs| {
            acc.extend(pairs);
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bboxes::BboxBuffers;
    use crate::chunker::Chunker;
    use kessler_dynamics::StepData;
    use kessler_math::DDouble;

    fn still_particle(pos: [f64; 3], r: f64) -> StepData {
        let mut data = StepData::default();
        data.reset(1, 1.0);
        for axis in 0..3 {
            data.tcs.extend_from_slice(&[pos[axis], 0.0]);
        }
        for _ in 0..3 {
            data.tcs.extend_from_slice(&[0.0, 0.0]);
        }
        data.tcs.extend_from_slice(&[r, 0.0]);
        data.tcoords.push(DDouble::new(1.0));
        data
    }

    fn run_broad(steps: &[StepData], coll: &[bool], conj: &[bool]) -> Vec<(u32, u32)> {
        let chunker = Chunker::new(1.0, 1);
        let mut bbox = BboxBuffers::default();
        bbox.compute(&chunker, steps, 0.0);
        let mut sorted = SortBuffers::default();
        sorted.compute(&bbox, 1, steps.len());
        let mut tree = BvhTree::default();
        let n = sorted.n_active[0];
        tree.build(&sorted.chunk_mcodes(0)[..n], &sorted.chunk_aabbs(0)[..n]);
        let mut pairs = broad_phase(&tree, &sorted, 0, coll, conj);
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn overlapping_pair_is_emitted_once() {
        let steps = vec![
            still_particle([0.0, 0.0, 0.0], 0.3),
            still_particle([0.4, 0.0, 0.0], 0.3),
            still_particle([10.0, 0.0, 0.0], 0.3),
        ];
        let active = vec![true; 3];
        let inactive = vec![false; 3];
        let pairs = run_broad(&steps, &active, &inactive);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn matches_brute_force_on_random_cloud() {
        // Deterministic pseudo-random cloud via a tiny LCG.
        let mut seed = 0x2545f49_u64;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as f64 / (1u64 << 31) as f64
        };
        let steps: Vec<StepData> = (0..64)
            .map(|_| {
                still_particle(
                    [next() * 4.0, next() * 4.0, next() * 4.0],
                    0.2 + 0.2 * next(),
                )
            })
            .collect();
        let active = vec![true; steps.len()];
        let inactive = vec![false; steps.len()];

        let pairs = run_broad(&steps, &active, &inactive);

        // Brute force on the same boxes.
        let chunker = Chunker::new(1.0, 1);
        let mut bbox = BboxBuffers::default();
        bbox.compute(&chunker, &steps, 0.0);
        let mut expect = Vec::new();
        for i in 0..steps.len() {
            for j in i + 1..steps.len() {
                if bbox.chunk_aabbs(0)[i].overlaps(&bbox.chunk_aabbs(0)[j]) {
                    expect.push((i as u32, j as u32));
                }
            }
        }
        assert_eq!(pairs, expect);
    }

    #[test]
    fn one_active_participant_is_enough() {
        let steps = vec![
            still_particle([0.0, 0.0, 0.0], 0.5),
            still_particle([0.2, 0.0, 0.0], 0.5),
        ];
        // A single collision-active participant keeps the pair.
        let pairs = run_broad(&steps, &[true, false], &[false, false]);
        assert_eq!(pairs, vec![(0, 1)]);
        // Same for a single conjunction-active participant.
        let pairs = run_broad(&steps, &[false, false], &[false, true]);
        assert_eq!(pairs, vec![(0, 1)]);
        // Neither particle active for anything: nothing to report.
        let pairs = run_broad(&steps, &[false, false], &[false, false]);
        assert!(pairs.is_empty());
    }
}
