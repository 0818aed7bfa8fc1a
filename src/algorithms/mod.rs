//! The building blocks of the implicitly restarted Arnoldi method.
//!
//! ** NOTE: We recommend using the high-level [`crate::solvers::GenEigsSolver`] instead.
//! These modules are public for fine-grained control and for testing each phase of the
//! iteration in isolation.
//!
//! One outer iteration of the solver runs the phases in this order:
//!
//! 1. [`ritz`]: eigen-decompose the Hessenberg matrix `H` of the current
//!    [`arnoldi::ArnoldiFactorization`] into Ritz values, Ritz coordinate vectors and
//!    residual estimates.
//! 2. [`selection`]: order the Ritz values with a [`selection::SelectionRule`]; the
//!    leading `nev` are the wanted ones.
//! 3. [`convergence`]: count converged wanted pairs and pick the size the
//!    factorization is shrunk back to.
//! 4. [`restart`]: purge the unwanted directions with shifted QR steps and grow the
//!    factorization back to `ncv` columns.

pub mod arnoldi;
pub mod convergence;
pub mod restart;
pub mod ritz;
pub mod selection;

/// Working precision `ε^(2/3)` used by the breakdown, re-orthogonalization and
/// convergence tests.
#[inline]
pub fn precision() -> f64 {
    f64::EPSILON.powf(2.0 / 3.0)
}

/// A value that is tiny but whose reciprocal does not overflow.
pub(crate) const NEAR_ZERO: f64 = f64::MIN_POSITIVE * 10.0;
