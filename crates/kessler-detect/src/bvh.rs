//! Per-chunk linear BVH.
//!
//! Top-down, level-synchronous construction over Morton-sorted codes:
//! each node splits its particle range at the highest bit position
//! where the first and last code differ, locating the flip boundary by
//! binary search. Ranges of equal codes split at their midpoint so
//! leaves always hold exactly one particle.
//!
//! Nodes live in one arena vector per tree; children are array
//! positions with `-1` as the null sentinel, so there are no owning
//! back-pointers. After the structure is laid out, AABBs are refit one
//! level at a time from the deepest level up — children always live in
//! deeper levels, so their boxes are final when a parent reads them.

use rayon::prelude::*;

use kessler_math::aabb::Aabb;

/// Null child/parent sentinel.
pub const NO_NODE: i32 = -1;

/// One BVH node over a range of Morton-sorted particles.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    /// First particle (sorted position) covered by this node.
    pub begin: u32,
    /// One past the last covered particle.
    pub end: u32,
    /// Parent node index, `NO_NODE` for the root.
    pub parent: i32,
    /// Left child index, `NO_NODE` for leaves.
    pub left: i32,
    /// Right child index, `NO_NODE` for leaves.
    pub right: i32,
    /// Box enclosing every covered particle box.
    pub aabb: Aabb,
}

impl BvhNode {
    /// True when the node covers a single particle.
    pub fn is_leaf(&self) -> bool {
        self.left == NO_NODE
    }
}

/// A linear BVH for one chunk, rebuilt every superstep.
#[derive(Default)]
pub struct BvhTree {
    /// Arena of nodes; index 0 is the root (when non-empty).
    pub nodes: Vec<BvhNode>,
    /// Node index ranges per level, root level first.
    levels: Vec<(usize, usize)>,
}

impl BvhTree {
    /// True when the tree covers no particles.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuilds the tree over `codes`/`aabbs` (the active, sorted
    /// prefix of a chunk).
    pub fn build(&mut self, codes: &[u64], aabbs: &[Aabb]) {
        self.nodes.clear();
        self.levels.clear();
        let n = codes.len();
        if n == 0 {
            return;
        }

        self.nodes.push(BvhNode {
            begin: 0,
            end: n as u32,
            parent: NO_NODE,
            left: NO_NODE,
            right: NO_NODE,
            aabb: Aabb::EMPTY,
        });

        // Structure, one level at a time.
        let mut level_start = 0;
        while level_start < self.nodes.len() {
            let level_end = self.nodes.len();
            self.levels.push((level_start, level_end));

            // Splits for the whole level are independent.
            let splits: Vec<Option<u32>> = self.nodes[level_start..level_end]
                .par_iter()
                .map(|node| split_index(codes, node.begin, node.end))
                .collect();

            for (offset, split) in splits.into_iter().enumerate() {
                let idx = level_start + offset;
                let Some(split) = split else { continue };
                let (begin, end) = (self.nodes[idx].begin, self.nodes[idx].end);
                let left = self.nodes.len() as i32;
                self.nodes[idx].left = left;
                self.nodes[idx].right = left + 1;
                for (child_begin, child_end) in [(begin, split), (split, end)] {
                    self.nodes.push(BvhNode {
                        begin: child_begin,
                        end: child_end,
                        parent: idx as i32,
                        left: NO_NODE,
                        right: NO_NODE,
                        aabb: Aabb::EMPTY,
                    });
                }
            }
            level_start = level_end;
        }

        // AABB refit, deepest level first.
        for &(ls, le) in self.levels.iter().rev() {
            let (head, tail) = self.nodes.split_at_mut(le);
            let tail = &tail[..];
            head[ls..le].par_iter_mut().for_each(|node| {
                if node.is_leaf() {
                    let mut aabb = Aabb::EMPTY;
                    for k in node.begin..node.end {
                        aabb.merge(&aabbs[k as usize]);
                    }
                    node.aabb = aabb;
                } else {
                    // Children are past `le` by construction.
                    let mut aabb = tail[node.left as usize - le].aabb;
                    aabb.merge(&tail[node.right as usize - le].aabb);
                    node.aabb = aabb;
                }
            });
        }
    }
}

/// Split position for a node range, or `None` when the range is a
/// single particle (a leaf).
fn split_index(codes: &[u64], begin: u32, end: u32) -> Option<u32> {
    if end - begin <= 1 {
        return None;
    }
    let first = codes[begin as usize];
    let last = codes[end as usize - 1];
    if first == last {
        // All codes equal: no bit to split on, cut in the middle so
        // the recursion still bottoms out at single-particle leaves.
        return Some(begin + (end - begin) / 2);
    }
    let bit = 63 - (first ^ last).leading_zeros();
    let flipped = codes[begin as usize..end as usize]
        .partition_point(|&code| (code >> bit) & 1 == (first >> bit) & 1);
    Some(begin + flipped as u32)
}
