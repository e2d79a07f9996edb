//! ODE systems as Taylor coefficient recurrences.
//!
//! A [`Dynamics`] implementation knows how to extend the Taylor series
//! of the seven state variables (x, y, z, vx, vy, vz, r) one order at a
//! time, given all lower orders. Systems whose right-hand sides are not
//! polynomial in the state introduce auxiliary series rows (e.g. inverse
//! powers of the radius) with their own recurrences, so that every
//! extension step is a handful of Cauchy products.
//!
//! The particle radius `r` rides along as an inert seventh variable
//! (`r' = 0`), which keeps the trajectory record uniform for the
//! detection pipeline.

use kessler_types::constants::NVARS;

/// Integration order for a local error tolerance, following the usual
/// Taylor-method heuristic `p = ceil(-ln(tol) / 2)`.
pub fn order_for_tol(tol: f64) -> usize {
    ((-0.5 * tol.ln()).ceil() as usize).max(2)
}

/// Series rows for one particle: the seven state variables followed by
/// the dynamics' auxiliary variables, each holding `order + 1` Taylor
/// coefficients.
pub struct SeriesWorkspace {
    nrows: usize,
    len: usize,
    data: Vec<f64>,
}

impl SeriesWorkspace {
    /// Allocates a workspace for `naux` auxiliary rows at the given
    /// integration order.
    pub fn new(naux: usize, order: usize) -> Self {
        let nrows = NVARS + naux;
        let len = order + 1;
        Self {
            nrows,
            len,
            data: vec![0.0; nrows * len],
        }
    }

    /// Coefficients per row (`order + 1`).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the workspace holds no coefficients.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One full coefficient row.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.len..(row + 1) * self.len]
    }

    /// Single coefficient access.
    #[inline]
    pub fn get(&self, row: usize, k: usize) -> f64 {
        self.data[row * self.len + k]
    }

    /// Single coefficient write.
    #[inline]
    pub fn set(&mut self, row: usize, k: usize, v: f64) {
        self.data[row * self.len + k] = v;
    }

    /// Order-`k` coefficient of the series product of rows `a` and `b`
    /// (Cauchy product over orders `0..=k`).
    #[inline]
    pub fn conv(&self, a: usize, b: usize, k: usize) -> f64 {
        let ra = self.row(a);
        let rb = self.row(b);
        (0..=k).map(|j| ra[j] * rb[k - j]).sum()
    }

    /// Loads order-0 coefficients from a state vector and zeroes the
    /// rest of the state rows.
    pub fn load_state(&mut self, state: &[f64; NVARS]) {
        for row in 0..self.nrows {
            let base = row * self.len;
            self.data[base..base + self.len].fill(0.0);
        }
        for (row, &v) in state.iter().enumerate() {
            self.set(row, 0, v);
        }
    }

    /// True when every coefficient in the state rows is finite.
    pub fn state_rows_finite(&self) -> bool {
        self.data[..NVARS * self.len].iter().all(|v| v.is_finite())
    }

    /// The seven state-variable rows as one contiguous slice.
    #[inline]
    pub fn state_rows(&self) -> &[f64] {
        &self.data[..NVARS * self.len]
    }
}

/// An ODE system over the seven state variables.
///
/// Implementations must be deterministic: extending the same workspace
/// contents yields the same coefficients, which is what makes repeated
/// runs of a simulation reproducible.
pub trait Dynamics: Send + Sync {
    /// Number of auxiliary series rows the system needs.
    fn naux(&self) -> usize {
        0
    }

    /// Width of the per-particle parameter row.
    fn npars(&self) -> usize {
        0
    }

    /// Initializes auxiliary rows at order 0 from the state rows
    /// already loaded in `ws`.
    fn init_aux(&self, _ws: &mut SeriesWorkspace, _pars: &[f64]) {}

    /// Computes order `k + 1` for every row, given orders `0..=k`.
    fn extend(&self, ws: &mut SeriesWorkspace, pars: &[f64], k: usize);

    /// Clones the system behind a fresh box (object-safe `Clone`).
    fn clone_dyn(&self) -> Box<dyn Dynamics>;

    /// Returns the system's name.
    fn name(&self) -> &str;
}

impl Clone for Box<dyn Dynamics> {
    fn clone(&self) -> Self {
        self.clone_dyn()
    }
}

/// Ballistic motion: `x' = v`, `v' = 0`. Series terminate at order 1,
/// so the integrator covers any span in a single substep.
#[derive(Debug, Clone, Default)]
pub struct FreeMotion;

impl Dynamics for FreeMotion {
    fn extend(&self, ws: &mut SeriesWorkspace, _pars: &[f64], k: usize) {
        let kp1 = (k + 1) as f64;
        for axis in 0..3 {
            let v = ws.get(3 + axis, k) / kp1;
            ws.set(axis, k + 1, v);
            ws.set(3 + axis, k + 1, 0.0);
        }
        ws.set(6, k + 1, 0.0);
    }

    fn clone_dyn(&self) -> Box<dyn Dynamics> {
        Box::new(self.clone())
    }

    fn name(&self) -> &str {
        "free_motion"
    }
}

/// Keplerian dynamics around a central point mass:
/// `q'' = -mu q / |q|^3`.
///
/// The non-polynomial right-hand side is closed with two auxiliary
/// series, `u = 1/|q|^2` and `s = 1/|q|^3`, whose own derivatives are
/// polynomial in the augmented state:
///
/// ```text
/// u' = -2 (q . v) u^2
/// s' = -3 (q . v) u s
/// v' = -mu q s
/// ```
#[derive(Debug, Clone)]
pub struct PointMassGravity {
    /// Gravitational parameter of the central body.
    pub mu: f64,
}

/// Auxiliary row indices.
const U: usize = NVARS;
const S: usize = NVARS + 1;

impl PointMassGravity {
    /// A system with the given gravitational parameter.
    pub fn new(mu: f64) -> Self {
        Self { mu }
    }
}

impl Dynamics for PointMassGravity {
    fn naux(&self) -> usize {
        2
    }

    fn init_aux(&self, ws: &mut SeriesWorkspace, _pars: &[f64]) {
        let r2 = (0..3).map(|axis| ws.get(axis, 0).powi(2)).sum::<f64>();
        let u0 = 1.0 / r2;
        ws.set(U, 0, u0);
        ws.set(S, 0, u0 * u0.sqrt());
    }

    fn extend(&self, ws: &mut SeriesWorkspace, _pars: &[f64], k: usize) {
        let kp1 = (k + 1) as f64;

        // Positions and velocities. Both use only orders <= k.
        for axis in 0..3 {
            ws.set(axis, k + 1, ws.get(3 + axis, k) / kp1);
            ws.set(3 + axis, k + 1, -self.mu * ws.conv(axis, S, k) / kp1);
        }
        ws.set(6, k + 1, 0.0);

        // Auxiliary rows share the radial-rate series
        // d = q . v = x vx + y vy + z vz.
        let mut acc_u = 0.0;
        let mut acc_s = 0.0;
        for j in 0..=k {
            let dj: f64 = (0..3).map(|axis| ws.conv(axis, 3 + axis, j)).sum();
            acc_u += dj * ws.conv(U, U, k - j);
            acc_s += dj * ws.conv(U, S, k - j);
        }
        ws.set(U, k + 1, -2.0 * acc_u / kp1);
        ws.set(S, k + 1, -3.0 * acc_s / kp1);
    }

    fn clone_dyn(&self) -> Box<dyn Dynamics> {
        Box::new(self.clone())
    }

    fn name(&self) -> &str {
        "point_mass_gravity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn extend_all(dyn_: &dyn Dynamics, state: [f64; NVARS], order: usize) -> SeriesWorkspace {
        let mut ws = SeriesWorkspace::new(dyn_.naux(), order);
        ws.load_state(&state);
        dyn_.init_aux(&mut ws, &[]);
        for k in 0..order {
            dyn_.extend(&mut ws, &[], k);
        }
        ws
    }

    #[test]
    fn free_motion_series_terminate() {
        let ws = extend_all(&FreeMotion, [1.0, 2.0, 3.0, -0.5, 0.25, 0.0, 0.1], 6);
        // x row: [x0, vx, 0, 0, ...]
        assert_eq!(ws.get(0, 1), -0.5);
        for k in 2..=6 {
            assert_eq!(ws.get(0, k), 0.0);
            assert_eq!(ws.get(3, k), 0.0);
        }
        // radius row inert
        assert_eq!(ws.get(6, 0), 0.1);
        assert_eq!(ws.get(6, 1), 0.0);
    }

    #[test]
    fn kepler_circular_orbit_matches_trig_series() {
        // Unit circular orbit: x(t) = cos t, y(t) = sin t.
        let dynamics = PointMassGravity::new(1.0);
        let ws = extend_all(&dynamics, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 8);

        for k in 0..=8 {
            let kf = k as i32;
            // cos t coefficients: 1, 0, -1/2!, 0, 1/4!, ...
            let cos_k = if k % 2 == 0 {
                (if k % 4 == 0 { 1.0 } else { -1.0 }) / (1..=kf).map(f64::from).product::<f64>()
            } else {
                0.0
            };
            let sin_k = if k % 2 == 1 {
                (if k % 4 == 1 { 1.0 } else { -1.0 }) / (1..=kf).map(f64::from).product::<f64>()
            } else {
                0.0
            };
            assert_relative_eq!(ws.get(0, k), cos_k, epsilon = 1e-14);
            assert_relative_eq!(ws.get(1, k), sin_k, epsilon = 1e-14);
        }
    }

    #[test]
    fn kepler_aux_rows_constant_on_circle() {
        // |q| is constant on a circular orbit, so u and s series are
        // [1, 0, 0, ...].
        let dynamics = PointMassGravity::new(1.0);
        let ws = extend_all(&dynamics, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 6);
        assert_relative_eq!(ws.get(U, 0), 1.0);
        assert_relative_eq!(ws.get(S, 0), 1.0);
        for k in 1..=6 {
            assert_relative_eq!(ws.get(U, k), 0.0, epsilon = 1e-15);
            assert_relative_eq!(ws.get(S, k), 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn order_for_tol_grows_with_precision() {
        assert_eq!(order_for_tol(1.0e-4), 5);
        assert!(order_for_tol(f64::EPSILON) >= 18);
        assert_eq!(order_for_tol(0.9), 2);
    }
}
