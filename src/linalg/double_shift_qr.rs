//! Francis double-shift QR step on an upper-Hessenberg matrix.
//!
//! A complex conjugate pair of shifts `μ, μ̄` is applied in real arithmetic through
//! the polynomial `M = H² - sH + tI` with `s = 2·Re μ` and `t = |μ|²`. The orthogonal
//! factor of `M = QR` is never formed from `M`: its first column is fixed by the first
//! column of `M`, and the rest follows by chasing the resulting bulge down the
//! subdiagonal with 3×3 Householder reflectors (implicit Q theorem).
//!
//! The implicit Q theorem only holds for unreduced matrices, so `H` is first split
//! at negligible subdiagonal entries and each diagonal block is chased on its own.
//! Note that the reflectors still act on the full rows and columns of `H`, which keeps
//! the off-diagonal coupling blocks consistent.

use super::zero_below_subdiagonal;
use faer::Mat;
use std::ops::Range;

/// A Householder reflector `P = I - τ·v·vᵀ` of length 2 or 3.
#[derive(Clone, Copy, Debug)]
struct Reflector {
    v: [f64; 3],
    len: usize,
    tau: f64,
}

impl Reflector {
    /// Builds `P` with `P·x = ∓‖x‖·e₁`, or `None` when `x` is zero.
    fn new(x: &[f64]) -> Option<Self> {
        let len = x.len();
        debug_assert!(len == 2 || len == 3);
        let norm = x.iter().map(|xi| xi * xi).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        let mut v = [0.0; 3];
        v[..len].copy_from_slice(x);
        // Adding the norm with the sign of x[0] avoids cancellation.
        v[0] += x[0].signum() * norm;
        let vtv: f64 = v[..len].iter().map(|vi| vi * vi).sum();
        if vtv == 0.0 {
            return None;
        }
        Some(Self {
            v,
            len,
            tau: 2.0 / vtv,
        })
    }

    /// `m[row0..row0+len, cols] ← P·m[row0..row0+len, cols]`.
    fn apply_left(&self, m: &mut Mat<f64>, row0: usize, cols: Range<usize>) {
        for j in cols {
            let mut dot = 0.0;
            for k in 0..self.len {
                dot += self.v[k] * m[(row0 + k, j)];
            }
            let scale = self.tau * dot;
            for k in 0..self.len {
                m[(row0 + k, j)] -= scale * self.v[k];
            }
        }
    }

    /// `m[rows, col0..col0+len] ← m[rows, col0..col0+len]·P`.
    fn apply_right(&self, m: &mut Mat<f64>, col0: usize, rows: Range<usize>) {
        for i in rows {
            let mut dot = 0.0;
            for k in 0..self.len {
                dot += m[(i, col0 + k)] * self.v[k];
            }
            let scale = self.tau * dot;
            for k in 0..self.len {
                m[(i, col0 + k)] -= scale * self.v[k];
            }
        }
    }
}

/// Performs one Francis double-shift step with shift polynomial `x² - s·x + t` on the
/// square upper-Hessenberg `h`, overwriting it with `QᵀHQ` and right-multiplying `y`
/// by `Q`. Subdiagonal entries below `ε·(|h_{i-1,i-1}| + |h_{i,i}|)` are set to zero.
///
/// `y` must have `h.nrows()` columns.
pub fn double_shift_step(h: &mut Mat<f64>, s: f64, t: f64, y: &mut Mat<f64>) {
    let n = h.nrows();
    debug_assert_eq!(h.ncols(), n);
    debug_assert_eq!(y.ncols(), n);

    let mut block_starts = vec![0];
    for i in 1..n {
        let scale = h[(i - 1, i - 1)].abs() + h[(i, i)].abs();
        if h[(i, i - 1)].abs() <= f64::EPSILON * scale {
            h[(i, i - 1)] = 0.0;
            block_starts.push(i);
        }
    }
    block_starts.push(n);

    for bounds in block_starts.windows(2) {
        chase_block(h, y, bounds[0], bounds[1], s, t);
    }
    zero_below_subdiagonal(h);
}

// Applies the double-shift step to the unreduced diagonal block `lo..hi`.
fn chase_block(h: &mut Mat<f64>, y: &mut Mat<f64>, lo: usize, hi: usize, s: f64, t: f64) {
    let n = h.nrows();
    let y_rows = y.nrows();
    let size = hi - lo;
    if size < 2 {
        return;
    }

    // First column of M = H² - sH + tI restricted to the block.
    let h00 = h[(lo, lo)];
    let h10 = h[(lo + 1, lo)];
    let h01 = h[(lo, lo + 1)];
    let h11 = h[(lo + 1, lo + 1)];
    let mut x = h00 * h00 + h01 * h10 - s * h00 + t;
    let mut yy = h10 * (h00 + h11 - s);

    if size == 2 {
        if let Some(p) = Reflector::new(&[x, yy]) {
            p.apply_left(h, lo, lo..n);
            p.apply_right(h, lo, 0..hi);
            p.apply_right(y, lo, 0..y_rows);
        }
        return;
    }

    let mut z = h10 * h[(lo + 2, lo + 1)];
    for k in 0..size - 2 {
        let r0 = lo + k;
        if let Some(p) = Reflector::new(&[x, yy, z]) {
            let first_col = if k == 0 { lo } else { r0 - 1 };
            p.apply_left(h, r0, first_col..n);
            p.apply_right(h, r0, 0..(r0 + 4).min(hi));
            p.apply_right(y, r0, 0..y_rows);
        }
        x = h[(r0 + 1, r0)];
        yy = h[(r0 + 2, r0)];
        if k + 3 < size {
            z = h[(r0 + 3, r0)];
        }
    }

    // The bulge has reached the bottom; a 2×2 reflector finishes the chase.
    if let Some(p) = Reflector::new(&[x, yy]) {
        p.apply_left(h, hi - 2, (hi - 3)..n);
        p.apply_right(h, hi - 2, 0..hi);
        p.apply_right(y, hi - 2, 0..y_rows);
    }
}
