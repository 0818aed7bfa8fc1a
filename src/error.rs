//! This module defines the custom error types for the library.
//!
//! Every failure that can leave the eigensolver is funneled into a single public
//! type, [`EigsError`], which wraps an [`EigsErrorKind`]. The kinds fall into four
//! families:
//!
//! - **Configuration errors** ([`EigsErrorKind::InvalidConfiguration`],
//!   [`EigsErrorKind::NotSquare`], [`EigsErrorKind::DimensionMismatch`],
//!   [`EigsErrorKind::ZeroInitialVector`], [`EigsErrorKind::SingularShift`]) are
//!   detected eagerly, in [`crate::solvers::GenEigsSolver::init`] or when a
//!   [`crate::shift_invert::ShiftInvert`] operator is built.
//! - **State errors** ([`EigsErrorKind::NotInitialized`], [`EigsErrorKind::NotComputed`],
//!   [`EigsErrorKind::NoConvergedPairs`]) signal a violated calling contract.
//! - **Operator errors** ([`EigsErrorKind::Operator`]) carry the error returned by the
//!   user's [`crate::matrix::LinearOperator`] unchanged, so it can be downcast.
//! - **Numerical errors** ([`EigsErrorKind::Breakdown`], [`EigsErrorKind::Evd`]) are
//!   raised by the algorithm layer. The solver facade turns them into the
//!   [`crate::solvers::SolverState::NumericalIssue`] status instead of returning them.
//!
//! Note that [`faer::linalg::evd::EvdError`] does not implement [`std::error::Error`],
//! so it is wrapped manually and formatted with `Debug`.
use thiserror::Error;

/// Represents all possible errors that can occur while solving a partial eigenproblem.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct EigsError(#[from] EigsErrorKind);

impl EigsError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> &EigsErrorKind {
        &self.0
    }

    /// Returns `true` for errors caused by an invalid solver or operator setup.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.0,
            EigsErrorKind::InvalidConfiguration(_)
                | EigsErrorKind::NotSquare { .. }
                | EigsErrorKind::DimensionMismatch { .. }
                | EigsErrorKind::ZeroInitialVector
                | EigsErrorKind::SingularShift { .. }
        )
    }

    /// Returns `true` for errors caused by calling the solver out of order.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self.0,
            EigsErrorKind::NotInitialized
                | EigsErrorKind::NotComputed
                | EigsErrorKind::NoConvergedPairs
        )
    }

    /// Returns `true` for failures of the numerical algorithm itself.
    pub fn is_numerical_issue(&self) -> bool {
        matches!(
            self.0,
            EigsErrorKind::Breakdown { .. } | EigsErrorKind::Evd(_)
        )
    }
}

/// The distinct kinds of errors.
#[derive(Error, Debug)]
pub enum EigsErrorKind {
    /// A configuration parameter violates its documented constraints.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The operator does not map a space onto itself.
    #[error("Operator must be square, but it has {nrows} rows and {ncols} columns.")]
    NotSquare { nrows: usize, ncols: usize },

    /// The dimensions of the operator and a vector are incompatible.
    #[error(
        "Dimension mismatch: operator has {operator_cols} columns but vector has {vector_rows} rows."
    )]
    DimensionMismatch {
        operator_cols: usize,
        vector_rows: usize,
    },

    /// The initial residual vector is zero (or numerically indistinguishable from zero).
    #[error("Invalid input parameter: the initial vector must not be a zero vector.")]
    ZeroInitialVector,

    /// `A - σI` cannot be factored because the shift is an eigenvalue of `A`.
    #[error("The shift {shift} is an eigenvalue of the operator, so A - {shift}·I is singular.")]
    SingularShift { shift: f64 },

    /// `compute` or `step` was called before `init`.
    #[error("The solver has not been initialized; call `init` first.")]
    NotInitialized,

    /// A result accessor was called before the iteration reached a terminal state.
    #[error("No results are available; call `compute` first.")]
    NotComputed,

    /// The iteration terminated without a single converged Ritz pair.
    #[error("The iteration terminated without any converged eigenpair.")]
    NoConvergedPairs,

    /// The user-supplied operator failed while being applied.
    #[error("Operator application failed: {0}")]
    Operator(#[source] anyhow::Error),

    /// The Arnoldi process could not find a new direction orthogonal to the basis.
    #[error(
        "Arnoldi breakdown at step {step}: no vector orthogonal to the current Krylov basis could be generated."
    )]
    Breakdown { step: usize },

    /// Wraps an error originating from [`faer`]'s eigendecomposition module.
    #[error("A numerical error occurred during the eigendecomposition of H: {0:?}")]
    Evd(faer::linalg::evd::EvdError),
}
