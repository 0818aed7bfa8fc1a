//! Ritz pairs of an Arnoldi factorization.
//!
//! The eigenpairs `(θ, y)` of the Hessenberg matrix `H` are the Ritz pairs of `A` on
//! the Krylov subspace: `x = V·y` approximates an eigenvector of `A` with
//!
//! ```text
//! ‖A·x - θ·x‖ = ‖f‖·|e_lenᵀ·y|
//! ```
//!
//! when `y` has unit norm, so the residual of every pair is known without touching
//! `A`. The Ritz vectors themselves are only assembled by the solver for the final
//! converged pairs.

use super::{arnoldi::ArnoldiFactorization, precision, selection::SelectionRule};
use crate::error::{EigsError, EigsErrorKind};
use faer::{Mat, MatRef, c64, linalg::evd::EvdError};

/// Ritz values, unit-norm coordinate vectors and residual estimates, in matching order.
#[derive(Debug, Clone)]
pub struct RitzPairs {
    values: Vec<c64>,
    vectors: Mat<c64>,
    residuals: Vec<f64>,
}

impl RitzPairs {
    /// Eigen-decomposes `H` of `fac` with [`faer`]'s general eigensolver.
    ///
    /// # Errors
    /// [`EigsErrorKind::Evd`] when the dense eigendecomposition fails.
    pub fn extract(fac: &ArnoldiFactorization) -> Result<Self, EigsError> {
        let h = fac.hessenberg();
        let len = h.nrows();
        let evd = h.eigen().map_err(EigsErrorKind::Evd)?;
        let s = evd.S();
        let u = evd.U();

        let values: Vec<c64> = (0..len).map(|i| s[i]).collect();
        let mut vectors = Mat::<c64>::zeros(len, len);
        let mut residuals = Vec::with_capacity(len);
        for j in 0..len {
            let norm = (0..len).map(|i| u[(i, j)].norm_sqr()).sum::<f64>().sqrt();
            if !(norm > 0.0 && norm.is_finite()) {
                return Err(EigsErrorKind::Evd(EvdError::NoConvergence).into());
            }
            for i in 0..len {
                vectors[(i, j)] = u[(i, j)] / norm;
            }
            residuals.push(fac.residual_norm() * vectors[(len - 1, j)].norm());
        }

        Ok(Self {
            values,
            vectors,
            residuals,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[c64] {
        &self.values
    }

    /// Coordinate vectors `y`, one unit-norm column per Ritz value.
    pub fn vectors(&self) -> MatRef<'_, c64> {
        self.vectors.as_ref()
    }

    /// Residual estimates `‖f‖·|y_last|`.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Returns the pairs reordered by `rule`, wanted pairs first.
    pub fn sorted(&self, rule: SelectionRule) -> Self {
        let order = super::selection::sort_indices(&self.values, rule);
        let len = self.len();
        Self {
            values: order.iter().map(|&i| self.values[i]).collect(),
            vectors: Mat::from_fn(len, len, |i, j| self.vectors[(i, order[j])]),
            residuals: order.iter().map(|&i| self.residuals[i]).collect(),
        }
    }
}

/// Returns `true` if `a` is non-real and `b` is its complex conjugate, up to rounding.
pub(crate) fn is_conjugate_pair(a: c64, b: c64) -> bool {
    if a.im == 0.0 {
        return false;
    }
    let tol = precision() * a.norm();
    (a.re - b.re).abs() <= tol && (a.im + b.im).abs() <= tol
}
