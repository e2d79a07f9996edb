//! Integration tests for kessler-detect: the full pipeline over
//! fabricated trajectory records.

use approx::assert_relative_eq;
use kessler_detect::{DetectionPipeline, DetectionSettings};
use kessler_dynamics::StepData;
use kessler_math::DDouble;

/// Linear motion record: x(t) = x0 + v t on [0, span], order 1.
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

fn settings(delta_t: f64, nchunks: usize) -> DetectionSettings {
    DetectionSettings {
        delta_t,
        nchunks,
        conj_thresh: 0.0,
        min_coll_radius: 0.0,
    }
}

#[test]
fn head_on_pair_collides_once() {
    let steps = vec![
        linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0),
        linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
    ];
    let active = vec![true; 2];
    let inactive = vec![false; 2];
    let mut pipeline = DetectionPipeline::default();
    let report = pipeline.run(&steps, &active, &inactive, settings(2.0, 1));

    assert_eq!(report.candidate_pairs, 1);
    assert_eq!(report.collisions.len(), 1);
    assert_relative_eq!(report.collisions[0].t, 0.99, epsilon = 1e-9);
}

#[test]
fn collision_found_regardless_of_chunk_count() {
    let steps = vec![
        linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0),
        linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
    ];
    let active = vec![true; 2];
    let inactive = vec![false; 2];

    for nchunks in [1, 2, 3, 5, 8] {
        let mut pipeline = DetectionPipeline::default();
        let report = pipeline.run(&steps, &active, &inactive, settings(2.0, nchunks));
        assert_eq!(report.collisions.len(), 1, "nchunks = {nchunks}");
        assert_relative_eq!(report.collisions[0].t, 0.99, epsilon = 1e-9);
        // Event time lands inside the superstep.
        assert!(report.collisions[0].t >= 0.0 && report.collisions[0].t < 2.0);
    }
}

#[test]
fn conjunction_threshold_gates_reporting() {
    let steps = vec![
        linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.01, 2.0),
        linear_step([1.0, 0.03, 0.0], [-1.0, 0.0, 0.0], 0.01, 2.0),
    ];
    let active = vec![true; 2];

    // Threshold above the miss distance: one conjunction, no collision.
    let mut pipeline = DetectionPipeline::default();
    let mut s = settings(2.0, 1);
    s.conj_thresh = 0.05;
    let report = pipeline.run(&steps, &active, &active, s);
    assert!(report.collisions.is_empty());
    let conj: Vec<_> = report.conjunctions.iter().flatten().collect();
    assert_eq!(conj.len(), 1);
    assert_relative_eq!(conj[0].dist, 0.03, epsilon = 1e-9);
    assert_relative_eq!(conj[0].t, 1.0, epsilon = 1e-9);

    // Threshold below the miss distance: nothing.
    let mut s = settings(2.0, 1);
    s.conj_thresh = 0.02;
    let report = pipeline.run(&steps, &active, &active, s);
    let conj_count: usize = report.conjunctions.iter().map(Vec::len).sum();
    assert_eq!(conj_count, 0);
}

#[test]
fn distant_particles_produce_no_candidates() {
    let steps: Vec<StepData> = (0..8)
        .map(|i| linear_step([10.0 * i as f64, 0.0, 0.0], [0.0; 3], 0.1, 1.0))
        .collect();
    let active = vec![true; 8];
    let inactive = vec![false; 8];
    let mut pipeline = DetectionPipeline::default();
    let report = pipeline.run(&steps, &active, &inactive, settings(1.0, 2));

    assert_eq!(report.candidate_pairs, 0);
    assert!(report.collisions.is_empty());
}

#[test]
fn crossing_cloud_matches_brute_force_collision_set() {
    // A deterministic cloud of crossing particles; compare the
    // pipeline's collision set against an all-pairs check.
    let mut seed = 0x9e3779b9_u64;
    let mut next = move || {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (seed >> 33) as f64 / (1u64 << 31) as f64
    };
    let steps: Vec<StepData> = (0..24)
        .map(|_| {
            let x0 = [next() * 2.0 - 1.0, next() * 2.0 - 1.0, next() * 2.0 - 1.0];
            let v = [next() - 0.5, next() - 0.5, next() - 0.5];
            linear_step(x0, v, 0.05, 1.0)
        })
        .collect();
    let active = vec![true; steps.len()];
    let inactive = vec![false; steps.len()];

    let mut pipeline = DetectionPipeline::default();
    let report = pipeline.run(&steps, &active, &inactive, settings(1.0, 2));
    let mut found: Vec<(u32, u32)> = report.collisions.iter().map(|c| (c.i, c.j)).collect();
    found.sort_unstable();
    found.dedup();

    // Brute force: sample each pair's distance densely.
    let mut expect = Vec::new();
    for i in 0..steps.len() {
        for j in i + 1..steps.len() {
            let mut si = [0.0; 7];
            let mut sj = [0.0; 7];
            let touched = (0..=4000).any(|k| {
                let t = k as f64 / 4000.0;
                steps[i].eval_state(t, &mut si);
                steps[j].eval_state(t, &mut sj);
                let d2: f64 = (0..3).map(|a| (si[a] - sj[a]).powi(2)).sum();
                d2.sqrt() <= 0.1
            });
            if touched {
                expect.push((i as u32, j as u32));
            }
        }
    }
    assert_eq!(found, expect);
}

#[test]
fn event_times_respect_temporal_bounds() {
    let steps = vec![
        linear_step([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0.3, 2.0),
        linear_step([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.3, 2.0),
        linear_step([0.0, -1.0, 0.0], [0.0, 1.0, 0.0], 0.3, 2.0),
        linear_step([0.0, 1.0, 0.0], [0.0, -1.0, 0.0], 0.3, 2.0),
    ];
    let active = vec![true; 4];
    let inactive = vec![false; 4];
    let mut pipeline = DetectionPipeline::default();
    let report = pipeline.run(&steps, &active, &inactive, settings(2.0, 3));

    assert!(!report.collisions.is_empty());
    for c in &report.collisions {
        assert!(c.t >= 0.0 && c.t < 2.0);
        assert!(c.i < c.j);
    }
}
