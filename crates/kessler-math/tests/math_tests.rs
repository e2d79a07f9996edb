//! Integration tests for kessler-math.

use approx::assert_relative_eq;
use glam::DVec3;
use kessler_math::{aabb::Aabb, dfloat::DDouble, morton, poly};

// ─── Affine domain mapping ────────────────────────────────────

#[test]
fn translate_then_rescale_maps_interval_to_unit() {
    // Map p on [a, b] to q on [0, 1] the way the narrow phase does:
    // q(x) = p(a + (b - a) x).
    let p = vec![0.5, -1.0, 2.0, -0.25];
    let (a, b) = (0.3, 1.1);

    let mut q = p.clone();
    poly::translate(&mut q, a);
    poly::rescale(&mut q, b - a);

    for k in 0..=10 {
        let x = k as f64 / 10.0;
        assert_relative_eq!(
            poly::eval(&q, x),
            poly::eval(&p, a + (b - a) * x),
            max_relative = 1e-12
        );
    }
}

#[test]
fn root_bound_after_mapping_finds_known_root() {
    // p(t) = t - 0.7 on [0.5, 1.0] has one root; map to [0, 1].
    let mut q = vec![-0.7, 1.0];
    poly::translate(&mut q, 0.5);
    poly::rescale(&mut q, 0.5);
    let mut scratch = Vec::new();
    assert_eq!(poly::unit_root_bound(&q, &mut scratch), 1);
}

// ─── Morton / AABB interplay ──────────────────────────────────

#[test]
fn centroid_codes_sort_along_diagonal() {
    let glb = DVec3::splat(-10.0);
    let gub = DVec3::splat(10.0);

    let mut codes: Vec<u64> = (0..32)
        .map(|i| {
            let t = -9.0 + 18.0 * i as f64 / 31.0;
            morton::morton_code(DVec3::splat(t), glb, gub)
        })
        .collect();

    let sorted = {
        let mut c = codes.clone();
        c.sort_unstable();
        c
    };
    assert_eq!(codes, sorted, "diagonal sweep should already be in Morton order");
    codes.dedup();
    assert_eq!(codes.len(), 32, "distinct centroids should get distinct codes");
}

#[test]
fn sentinel_sorts_after_all_real_codes() {
    let glb = DVec3::splat(0.0);
    let gub = DVec3::splat(1.0);
    let code = morton::morton_code(DVec3::splat(1.0), glb, gub);
    assert!(code < morton::SENTINEL);
}

#[test]
fn aabb_centroid_is_box_center() {
    let b = Aabb {
        lb: [0.0, -2.0, 4.0, 0.0],
        ub: [2.0, 0.0, 8.0, 0.5],
    };
    assert_eq!(b.centroid(), DVec3::new(1.0, -1.0, 6.0));
}

// ─── Double-double substep accumulation ───────────────────────

#[test]
fn substep_boundaries_stay_monotonic() {
    // Emulate a superstep of many adaptive substeps with irrational-ish
    // widths; boundaries must remain strictly increasing in DDouble.
    let mut t = DDouble::ZERO;
    let mut prev = t;
    for k in 1..5_000 {
        let h = 1.0e-4 * (1.0 + 0.5 * ((k as f64).sin().abs()));
        t = t.add(h);
        assert!(t > prev);
        prev = t;
    }
    assert!(t.to_f64() > 0.4);
}
