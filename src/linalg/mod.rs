//! Small dense kernels on upper-Hessenberg matrices.
//!
//! The implicit restart needs one operation that [`faer`] does not expose as a
//! public building block: a single QR iteration on a Hessenberg matrix with a
//! caller-chosen shift, together with the orthogonal factor it applies. Two variants
//! are provided:
//!
//! - [`hessenberg_qr::single_shift_step`]: explicit `H - μI = QR`, `H ← RQ + μI`
//!   for a real shift μ, using Givens rotations.
//! - [`double_shift_qr::double_shift_step`]: the Francis implicit double-shift step
//!   for a complex conjugate pair of shifts, performed in real arithmetic.
//!
//! Both transform `H ← QᵀHQ` in place and accumulate `Y ← Y·Q` into a caller
//! supplied matrix. The matrices involved are at most `ncv × ncv`, so plain indexed
//! loops are used throughout.

pub mod double_shift_qr;
pub mod hessenberg_qr;

use faer::Mat;

/// Clears the entries below the first subdiagonal, which after a QR step only hold
/// rounding residue.
pub(crate) fn zero_below_subdiagonal(h: &mut Mat<f64>) {
    let n = h.nrows();
    for j in 0..n {
        for i in (j + 2)..n {
            h[(i, j)] = 0.0;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use faer::Mat;

    /// `max |(QᵀAQ - B)_ij|`.
    pub fn similarity_error(a: &Mat<f64>, q: &Mat<f64>, b: &Mat<f64>) -> f64 {
        let qtaq = q.transpose() * a * q;
        max_abs_diff(&qtaq, b)
    }

    /// `max |(QᵀQ - I)_ij|`.
    pub fn orthogonality_error(q: &Mat<f64>) -> f64 {
        let qtq = q.transpose() * q;
        max_abs_diff(&qtq, &Mat::identity(q.ncols(), q.ncols()))
    }

    pub fn max_abs_diff(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
        let mut err = 0.0f64;
        for j in 0..a.ncols() {
            for i in 0..a.nrows() {
                err = err.max((a[(i, j)] - b[(i, j)]).abs());
            }
        }
        err
    }

    pub fn is_upper_hessenberg(h: &Mat<f64>) -> bool {
        (0..h.ncols()).all(|j| ((j + 2)..h.nrows()).all(|i| h[(i, j)] == 0.0))
    }

    /// A dense upper-Hessenberg matrix with deterministic pseudo-random entries.
    pub fn sample_hessenberg(n: usize) -> Mat<f64> {
        Mat::from_fn(n, n, |i, j| {
            if i > j + 1 {
                0.0
            } else {
                ((i * 7 + j * 13 + 3) % 11) as f64 / 5.0 - 1.0
            }
        })
    }
}
