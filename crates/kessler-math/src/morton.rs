//! Morton (Z-order) encoding of AABB centroids.
//!
//! Each spatial axis is quantized to 21 bits against the chunk-global
//! bounding box, and the three coordinates are bit-interleaved into a
//! 63-bit key. Sorting particles by this key groups spatial neighbors,
//! which is what makes the linear BVH construction work.

use glam::DVec3;

/// Bits per axis.
pub const Z_ORDER_BITS: u32 = 21;

/// Sentinel code for particles that have no geometry in a chunk
/// (terminated before the chunk begins). Sorts after every real code
/// so a single partition point excludes them.
pub const SENTINEL: u64 = u64::MAX;

/// Spreads the low 21 bits of `x` so that consecutive bits land three
/// positions apart.
#[inline]
pub fn interleave_3(mut x: u64) -> u64 {
    x &= 0x1fffff;
    x = (x | x << 32) & 0x1f00000000ffff;
    x = (x | x << 16) & 0x1f0000ff0000ff;
    x = (x | x << 8) & 0x100f00f00f00f00f;
    x = (x | x << 4) & 0x10c30c30c30c30c3;
    x = (x | x << 2) & 0x1249249249249249;
    x
}

/// Interleaves three 21-bit integers into a 63-bit Morton key.
#[inline]
pub fn morton3(ix: u64, iy: u64, iz: u64) -> u64 {
    interleave_3(ix) | (interleave_3(iy) << 1) | (interleave_3(iz) << 2)
}

/// Quantizes one coordinate into `[0, 2^21)` relative to `[lo, hi]`.
#[inline]
fn quantize(v: f64, lo: f64, hi: f64) -> u64 {
    let extent = hi - lo;
    let frac = if extent > 0.0 {
        ((v - lo) / extent).clamp(0.0, 1.0 - f64::EPSILON)
    } else {
        // Degenerate global box (e.g. a single particle).
        0.5
    };
    (frac * (1u64 << Z_ORDER_BITS) as f64) as u64
}

/// Morton code of a centroid relative to the chunk-global AABB.
pub fn morton_code(centroid: DVec3, glb: DVec3, gub: DVec3) -> u64 {
    morton3(
        quantize(centroid.x, glb.x, gub.x),
        quantize(centroid.y, glb.y, gub.y),
        quantize(centroid.z, glb.z, gub.z),
    )
}
