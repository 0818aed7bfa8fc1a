//! Shift-and-invert spectral transformation.
//!
//! Restarted Arnoldi converges to the eigenvalues at the edge of the spectrum. The
//! eigenvalues closest to a shift `σ` are interior ones, and a polynomial filter
//! barely separates them from the rest. The operator `(A - σI)⁻¹` has eigenvalues
//! `ν = 1 / (λ - σ)` with the same eigenvectors, so the eigenvalues of `A` nearest to
//! `σ` become the ones of largest magnitude. Running the solver with
//! [`crate::SelectionRule::LargestMagnitude`] on a [`ShiftInvert`] operator and mapping
//! the results back with [`ShiftInvert::recover`] yields them in order of increasing
//! distance to `σ`.
//!
//! `A - σI` is factored once at construction, with faer's partial pivoting LU for
//! dense matrices and its sparse LU for sparse ones. Every application is then a pair
//! of triangular solves.

use crate::{
    error::{EigsError, EigsErrorKind},
    matrix::LinearOperator,
};
use anyhow::ensure;
use faer::{
    Col, ColRef, Mat, MatRef, c64,
    linalg::solvers::PartialPivLu,
    sparse::{
        SparseColMat, SparseColMatRef, Triplet,
        linalg::{LuError, solvers::Lu},
    },
};

enum Factorization {
    Dense(PartialPivLu<f64>),
    Sparse(Lu<usize, f64>),
}

/// The operator `(A - σI)⁻¹`, applied through a precomputed LU factorization.
///
/// # Example
///
/// ```
/// use arnoldi_eigs::{LinearOperator, shift_invert::ShiftInvert};
/// use faer::{Col, c64, mat};
///
/// let a = mat![[2.0, 1.0], [0.0, 4.0]];
/// let op = ShiftInvert::dense(a.as_ref(), 1.0).unwrap();
///
/// // (A - I)⁻¹ maps the eigenvector e₀ of λ = 2 to itself scaled by 1 / (2 - 1).
/// let y = op.apply(Col::from_fn(2, |i| if i == 0 { 1.0 } else { 0.0 }).as_ref()).unwrap();
/// assert!((y[0] - 1.0).abs() < 1e-14);
/// assert_eq!(op.recover(c64::new(1.0, 0.0)), c64::new(2.0, 0.0));
/// ```
pub struct ShiftInvert {
    shift: f64,
    dim: usize,
    lu: Factorization,
}

fn check_square(nrows: usize, ncols: usize) -> Result<(), EigsError> {
    if nrows != ncols {
        return Err(EigsErrorKind::NotSquare { nrows, ncols }.into());
    }
    Ok(())
}

fn check_shift(shift: f64) -> Result<(), EigsError> {
    if !shift.is_finite() {
        return Err(EigsErrorKind::InvalidConfiguration(format!(
            "the shift must be finite, got {shift}"
        ))
        .into());
    }
    Ok(())
}

impl ShiftInvert {
    /// Factors `A - σI` for a dense `A`.
    ///
    /// Fails with [`EigsErrorKind::SingularShift`] when `σ` is (numerically) an
    /// eigenvalue of `A`.
    pub fn dense(a: MatRef<'_, f64>, shift: f64) -> Result<Self, EigsError> {
        check_square(a.nrows(), a.ncols())?;
        check_shift(shift)?;
        let n = a.nrows();
        let shifted = Mat::from_fn(n, n, |i, j| {
            if i == j { a[(i, j)] - shift } else { a[(i, j)] }
        });
        let lu = shifted.partial_piv_lu();

        let u = lu.U();
        if (0..n).any(|i| u[(i, i)] == 0.0 || !u[(i, i)].is_finite()) {
            return Err(EigsErrorKind::SingularShift { shift }.into());
        }
        log::debug!("Factored the dense {n}x{n} shifted operator (shift {shift}).");

        Ok(Self {
            shift,
            dim: n,
            lu: Factorization::Dense(lu),
        })
    }

    /// Factors `A - σI` for a sparse `A`. Missing diagonal entries are inserted.
    ///
    /// Fails with [`EigsErrorKind::SingularShift`] when `σ` is (numerically) an
    /// eigenvalue of `A` or the sparsity pattern of `A - σI` is structurally singular.
    pub fn sparse(a: SparseColMatRef<'_, usize, f64>, shift: f64) -> Result<Self, EigsError> {
        let (nrows, ncols) = (a.symbolic().nrows(), a.symbolic().ncols());
        check_square(nrows, ncols)?;
        check_shift(shift)?;
        let n = nrows;

        let mut has_diagonal = vec![false; n];
        let mut triplets: Vec<Triplet<usize, usize, f64>> = a
            .triplet_iter()
            .map(|t| {
                let mut val = *t.val;
                if t.row == t.col && !has_diagonal[t.row] {
                    has_diagonal[t.row] = true;
                    val -= shift;
                }
                Triplet {
                    row: t.row,
                    col: t.col,
                    val,
                }
            })
            .collect();
        triplets.extend((0..n).filter(|&i| !has_diagonal[i]).map(|i| Triplet {
            row: i,
            col: i,
            val: -shift,
        }));

        let shifted = SparseColMat::try_new_from_triplets(n, n, &triplets).map_err(|e| {
            EigsErrorKind::InvalidConfiguration(format!(
                "failed to assemble the shifted operator: {e:?}"
            ))
        })?;
        let lu = shifted.sp_lu().map_err(|e| match e {
            LuError::SymbolicSingular { .. } => EigsErrorKind::SingularShift { shift },
            other => EigsErrorKind::InvalidConfiguration(format!(
                "failed to factor the shifted operator: {other}"
            )),
        })?;

        let this = Self {
            shift,
            dim: n,
            lu: Factorization::Sparse(lu),
        };
        // A zero pivot does not fail the sparse factorization, it shows up in the solve.
        if n > 0 && this.solve(Col::from_fn(n, |_| 1.0).as_ref()).is_none() {
            return Err(EigsErrorKind::SingularShift { shift }.into());
        }
        log::debug!(
            "Factored the sparse {n}x{n} shifted operator with {} entries (shift {shift}).",
            triplets.len()
        );
        Ok(this)
    }

    /// The shift `σ` the operator was built with.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// Maps an eigenvalue `ν` of `(A - σI)⁻¹` back to the eigenvalue `σ + 1/ν` of `A`.
    ///
    /// Eigenvectors are shared by both operators and need no transformation.
    pub fn recover(&self, nu: c64) -> c64 {
        self.shift + 1.0 / nu
    }

    /// Maps a whole list of eigenvalues back, see [`ShiftInvert::recover`].
    pub fn recover_all(&self, values: &[c64]) -> Vec<c64> {
        values.iter().map(|&nu| self.recover(nu)).collect()
    }

    // `None` when the solution is not finite.
    fn solve(&self, rhs: ColRef<'_, f64>) -> Option<Col<f64>> {
        use faer::linalg::solvers::Solve;

        let mut x = rhs.to_owned();
        match &self.lu {
            Factorization::Dense(lu) => lu.solve_in_place(x.as_mut()),
            Factorization::Sparse(lu) => lu.solve_in_place(x.as_mut()),
        }
        x.is_all_finite().then_some(x)
    }
}

impl LinearOperator for ShiftInvert {
    #[inline]
    fn nrows(&self) -> usize {
        self.dim
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.dim
    }

    fn apply(&self, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>> {
        ensure!(
            rhs.nrows() == self.dim,
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            self.dim,
            rhs.nrows(),
        );
        self.solve(rhs).ok_or_else(|| {
            anyhow::anyhow!(
                "The shifted solve with shift {} produced non-finite values.",
                self.shift
            )
        })
    }
}
