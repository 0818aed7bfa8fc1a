//! This module defines the core abstraction for linear operators.
//!
//! The implicitly restarted Arnoldi method never looks at the entries of the matrix
//! whose eigenvalues it computes. Its only interaction with the operator is the
//! product `A * v`, repeated once per new Krylov direction. The algorithm can therefore
//! be written once against the [`LinearOperator`] trait and driven by dense matrices,
//! sparse matrices, or a closure that evaluates the product on the fly.
//!
//! Implementations are provided for [`faer`]'s dense (`Mat`, `MatRef`) and sparse
//! (`SparseColMat`, `SparseColMatRef`) matrices, and [`FnOperator`] adapts any
//! closure. Operator failures are reported through [`anyhow::Error`] and are forwarded
//! to the caller of the solver untouched.

use anyhow::ensure;
use faer::{
    Accum, Col, ColRef, Mat, MatRef, Par,
    dyn_stack::{MemBuffer, MemStack},
    linalg::matmul::matmul,
    sparse::{SparseColMat, SparseColMatRef},
};

/// Represents a real linear operator that can be applied to a vector.
///
/// The contract is that of a pure function: for the same input, `apply` must return
/// the same output and must not mutate any state observable by the solver, otherwise
/// convergence is not reproducible.
///
/// # Example
///
/// ```
/// use arnoldi_eigs::matrix::LinearOperator;
/// use faer::{Col, mat};
///
/// let a = mat![[2.0, 1.0], [0.0, 3.0]];
/// let x = Col::from_fn(2, |i| (i + 1) as f64);
/// let y = a.apply(x.as_ref()).unwrap();
/// assert_eq!(y[0], 4.0);
/// assert_eq!(y[1], 6.0);
/// ```
pub trait LinearOperator {
    /// Returns the number of rows of the operator.
    fn nrows(&self) -> usize;

    /// Returns the number of columns of the operator.
    fn ncols(&self) -> usize;

    /// Computes `A * rhs` and returns it as an owned column.
    ///
    /// The returned vector must have [`LinearOperator::nrows`] entries.
    fn apply(&self, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>>;
}

// Dense product through faer's matmul. Sequential execution keeps the
// summation order, and therefore the result, bit-reproducible.
fn dense_apply(a: MatRef<'_, f64>, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>> {
    ensure!(
        a.ncols() == rhs.nrows(),
        "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
        a.ncols(),
        rhs.nrows(),
    );
    let mut out = Col::<f64>::zeros(a.nrows());
    matmul(
        out.as_mut().as_mat_mut(),
        Accum::Replace,
        a,
        rhs.as_mat(),
        1.0,
        Par::Seq,
    );
    Ok(out)
}

// Sparse product through faer's matrix-free `LinOp` implementation.
fn sparse_apply(
    a: SparseColMatRef<'_, usize, f64>,
    rhs: ColRef<'_, f64>,
) -> anyhow::Result<Col<f64>> {
    // Imported locally: `LinOp::apply` would otherwise be ambiguous with ours.
    use faer::matrix_free::LinOp;

    // Both traits are implemented for `a`, so the dimensions come from its symbolic part.
    let (nrows, ncols) = (a.symbolic().nrows(), a.symbolic().ncols());
    ensure!(
        ncols == rhs.nrows(),
        "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
        ncols,
        rhs.nrows(),
    );
    let mut out = Col::<f64>::zeros(nrows);
    let mut mem = MemBuffer::new(LinOp::<f64>::apply_scratch(&a, 1, Par::Seq));
    let stack = MemStack::new(&mut mem);
    LinOp::<f64>::apply(&a, out.as_mut().as_mat_mut(), rhs.as_mat(), Par::Seq, stack);
    Ok(out)
}

impl LinearOperator for MatRef<'_, f64> {
    #[inline]
    fn nrows(&self) -> usize {
        (*self).nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        (*self).ncols()
    }

    fn apply(&self, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>> {
        dense_apply(*self, rhs)
    }
}

impl LinearOperator for Mat<f64> {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().ncols()
    }

    fn apply(&self, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>> {
        dense_apply(self.as_ref(), rhs)
    }
}

// The sparse accessors live on the symbolic structure behind a `Deref`, which method
// resolution only reaches after trying this trait, so they are named explicitly.
impl LinearOperator for SparseColMatRef<'_, usize, f64> {
    #[inline]
    fn nrows(&self) -> usize {
        self.symbolic().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.symbolic().ncols()
    }

    fn apply(&self, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>> {
        sparse_apply(*self, rhs)
    }
}

impl LinearOperator for SparseColMat<usize, f64> {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().symbolic().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().symbolic().ncols()
    }

    fn apply(&self, rhs: ColRef<'_, f64>) -> anyhow::Result<Col<f64>> {
        sparse_apply(self.as_ref(), rhs)
    }
}

/// A square operator defined by a closure computing `A * x`.
///
/// Useful when the operator is the composition of other operators or a simulation
/// that never assembles a matrix.
///
/// ```
/// use arnoldi_eigs::matrix::{FnOperator, LinearOperator};
/// use faer::Col;
///
/// // A cyclic shift, whose eigenvalues are the 4th roots of unity.
/// let shift = FnOperator::new(4, |x| Ok(Col::from_fn(4, |i| x[(i + 3) % 4])));
/// let y = shift.apply(Col::from_fn(4, |i| i as f64).as_ref()).unwrap();
/// assert_eq!(y[0], 3.0);
/// ```
pub struct FnOperator<F> {
    dim: usize,
    op: F,
}

impl<F> FnOperator<F>
where
    F: Fn(ColRef<'_, f64>) -> anyhow::Result<Col<f64>>,
{
    /// Wraps `op` as an operator acting on vectors of length `dim`.
    pub fn new(dim: usize, op: F) -> Self {
        Self { dim, op }
    }
}

impl<F> LinearOperator for FnOperator<F>
where
    F: Fn(ColRef<'_, f64>) -> anyhow::Result<Col<f64>>,
{
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
        (self.op)(rhs)
    }
}
