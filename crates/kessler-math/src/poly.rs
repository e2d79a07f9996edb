//! Dense univariate polynomial kernels.
//!
//! Polynomials are coefficient slices in monomial order: `c[k]` is the
//! coefficient of `x^k`. The narrow phase operates on fixed-length
//! slices of Taylor coefficients, so every routine here takes the
//! nominal length from the slice and tolerates zero high-order
//! coefficients.

/// Evaluates `p(x)` by Horner's scheme.
#[inline]
pub fn eval(c: &[f64], x: f64) -> f64 {
    let mut acc = 0.0;
    for &ck in c.iter().rev() {
        acc = acc * x + ck;
    }
    acc
}

/// Evaluates `p(x)` with Neumaier-compensated term summation.
///
/// Used by the high-accuracy integrator kernel, where the state update
/// sums terms spanning many orders of magnitude.
pub fn eval_compensated(c: &[f64], x: f64) -> f64 {
    let mut sum = 0.0;
    let mut comp = 0.0;
    let mut xk = 1.0;
    for &ck in c {
        let term = ck * xk;
        let t = sum + term;
        if sum.abs() >= term.abs() {
            comp += (sum - t) + term;
        } else {
            comp += (term - t) + sum;
        }
        sum = t;
        xk *= x;
    }
    sum + comp
}

/// Writes the derivative of `c` into `out` (`out.len() == c.len() - 1`,
/// or both empty).
pub fn derivative(c: &[f64], out: &mut Vec<f64>) {
    out.clear();
    for (k, &ck) in c.iter().enumerate().skip(1) {
        out.push(ck * k as f64);
    }
}

/// Translates in place: replaces `c` with the coefficients of
/// `p(x + a)` (Ruffini-Horner shift).
pub fn translate(c: &mut [f64], a: f64) {
    let n = c.len();
    if n < 2 || a == 0.0 {
        return;
    }
    for i in 0..n - 1 {
        for j in (i..n - 1).rev() {
            c[j] += a * c[j + 1];
        }
    }
}

/// Rescales in place: replaces `c` with the coefficients of `p(s * x)`.
pub fn rescale(c: &mut [f64], s: f64) {
    let mut sk = 1.0;
    for ck in c.iter_mut() {
        *ck *= sk;
        sk *= s;
    }
}

/// Accumulates the product `a * b` into `out` (`out` must hold at
/// least `a.len() + b.len() - 1` entries).
pub fn mul_acc(a: &[f64], b: &[f64], out: &mut [f64]) {
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
}

/// Composes the squared-distance polynomial of two trajectories:
/// `out = sum_axis (a_axis - b_axis)^2`.
///
/// `a` and `b` each hold three same-length coefficient slices (x, y, z)
/// on a common local time variable. `out` is resized to degree
/// `2 * (len - 1)`; `diff` is scratch.
pub fn sum_sq_diff3(a: [&[f64]; 3], b: [&[f64]; 3], diff: &mut Vec<f64>, out: &mut Vec<f64>) {
    let n = a[0].len();
    out.clear();
    out.resize(2 * n - 1, 0.0);
    for axis in 0..3 {
        diff.clear();
        diff.extend(a[axis].iter().zip(b[axis]).map(|(x, y)| x - y));
        mul_acc(diff, diff, out);
    }
}

/// Conservative range enclosure of `p` over `[0, w]`:
/// `p(0) +- sum_{k>=1} |c_k| w^k`.
pub fn enclose(c: &[f64], w: f64) -> (f64, f64) {
    let mut radius = 0.0;
    let mut wk = 1.0;
    for &ck in c.iter().skip(1) {
        wk *= w;
        radius += ck.abs() * wk;
    }
    (c[0] - radius, c[0] + radius)
}

/// Counts strict sign alternations in a coefficient sequence,
/// ignoring zeros.
pub fn sign_changes(c: &[f64]) -> u32 {
    let mut count = 0;
    let mut last = 0.0f64;
    for &ck in c {
        if ck == 0.0 {
            continue;
        }
        if last != 0.0 && ck.signum() != last.signum() {
            count += 1;
        }
        last = ck;
    }
    count
}

/// Descartes bound on the number of roots of `p` in the open unit
/// interval (0, 1).
///
/// Applies the Moebius map `x -> 1/(1 + x)`: the sign-change count of
/// `(1 + x)^n p(1/(1 + x))` bounds the root count and matches its
/// parity, so a count of 1 guarantees exactly one root. Computed as
/// coefficient reversal followed by a unit shift; `scratch` avoids an
/// allocation per call.
pub fn unit_root_bound(c: &[f64], scratch: &mut Vec<f64>) -> u32 {
    scratch.clear();
    scratch.extend(c.iter().rev());
    translate(scratch, 1.0);
    sign_changes(scratch)
}
