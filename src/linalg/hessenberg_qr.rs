//! Single-shift QR step on an upper-Hessenberg matrix.

use super::zero_below_subdiagonal;
use faer::Mat;
use std::ops::Range;

/// A plane rotation `G = [c s; -s c]` acting on two rows (from the left) or on two
/// columns (as `Gᵀ`, from the right).
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Givens {
    c: f64,
    s: f64,
}

impl Givens {
    /// Builds the rotation with `G·[a, b]ᵀ = [r, 0]ᵀ`, `r = hypot(a, b)`.
    pub(crate) fn new(a: f64, b: f64) -> Self {
        let r = a.hypot(b);
        if r == 0.0 {
            Self { c: 1.0, s: 0.0 }
        } else {
            Self { c: a / r, s: b / r }
        }
    }

    /// Rows `p` and `q` of `m`, restricted to `cols`, are replaced by `G·[row_p; row_q]`.
    pub(crate) fn apply_left(&self, m: &mut Mat<f64>, p: usize, q: usize, cols: Range<usize>) {
        for j in cols {
            let x = m[(p, j)];
            let y = m[(q, j)];
            m[(p, j)] = self.c * x + self.s * y;
            m[(q, j)] = -self.s * x + self.c * y;
        }
    }

    /// Columns `p` and `q` of `m`, restricted to `rows`, are replaced by
    /// `[col_p, col_q]·Gᵀ`.
    pub(crate) fn apply_right(&self, m: &mut Mat<f64>, p: usize, q: usize, rows: Range<usize>) {
        for i in rows {
            let x = m[(i, p)];
            let y = m[(i, q)];
            m[(i, p)] = self.c * x + self.s * y;
            m[(i, q)] = -self.s * x + self.c * y;
        }
    }
}

/// Performs one explicitly shifted QR step on the square upper-Hessenberg `h`.
///
/// Computes `H - μI = QR` with `n - 1` Givens rotations, then overwrites `h` with
/// `RQ + μI = QᵀHQ`, which is again upper Hessenberg, and right-multiplies `y` by `Q`.
/// When μ is an eigenvalue of an unreduced `H`, the last subdiagonal entry of the
/// result vanishes and `μ` appears in the bottom-right corner.
///
/// `y` must have `h.nrows()` columns.
pub fn single_shift_step(h: &mut Mat<f64>, shift: f64, y: &mut Mat<f64>) {
    let n = h.nrows();
    debug_assert_eq!(h.ncols(), n);
    debug_assert_eq!(y.ncols(), n);
    if n < 2 {
        return;
    }

    for i in 0..n {
        h[(i, i)] -= shift;
    }

    let mut rotations = Vec::with_capacity(n - 1);
    for i in 0..n - 1 {
        let g = Givens::new(h[(i, i)], h[(i + 1, i)]);
        g.apply_left(h, i, i + 1, i..n);
        h[(i + 1, i)] = 0.0;
        rotations.push(g);
    }

    // R is upper triangular, so rotation i only touches rows 0..=i+1.
    let y_rows = y.nrows();
    for (i, g) in rotations.iter().enumerate() {
        g.apply_right(h, i, i + 1, 0..(i + 2));
        g.apply_right(y, i, i + 1, 0..y_rows);
    }

    for i in 0..n {
        h[(i, i)] += shift;
    }
    zero_below_subdiagonal(h);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_utils::*;
    use faer::mat;

    #[test]
    fn test_givens_annihilates_second_entry() {
        let g = Givens::new(3.0, 4.0);
        let mut m: Mat<f64> = mat![[3.0], [4.0]];
        g.apply_left(&mut m, 0, 1, 0..1);
        assert!((m[(0, 0)] - 5.0).abs() < 1e-15);
        assert!(m[(1, 0)].abs() < 1e-15);
        assert_eq!(Givens::new(0.0, 0.0), Givens { c: 1.0, s: 0.0 });
    }

    #[test]
    fn test_single_shift_is_orthogonal_similarity() {
        let h0 = sample_hessenberg(6);
        let mut h = h0.clone();
        let mut q = Mat::<f64>::identity(6, 6);

        single_shift_step(&mut h, 0.3, &mut q);

        assert!(is_upper_hessenberg(&h));
        assert!(orthogonality_error(&q) < 1e-14);
        assert!(similarity_error(&h0, &q, &h) < 1e-13);
    }

    #[test]
    fn test_exact_shift_deflates_last_row() {
        // Companion matrix of (x - 1)(x - 2)(x - 3).
        let h0: Mat<f64> = mat![[0.0, 0.0, 6.0], [1.0, 0.0, -11.0], [0.0, 1.0, 6.0]];
        let mut h = h0.clone();
        let mut q = Mat::<f64>::identity(3, 3);

        single_shift_step(&mut h, 3.0, &mut q);

        assert!(h[(2, 1)].abs() < 1e-10);
        assert!((h[(2, 2)] - 3.0).abs() < 1e-10);
        assert!(similarity_error(&h0, &q, &h) < 1e-12);
    }

    #[test]
    fn test_one_by_one_is_untouched() {
        let mut h: Mat<f64> = mat![[2.5]];
        let mut q = Mat::<f64>::identity(1, 1);
        single_shift_step(&mut h, 1.0, &mut q);
        assert_eq!(h[(0, 0)], 2.5);
        assert_eq!(q[(0, 0)], 1.0);
    }
}
