//! Partial eigensolver for large general (non-symmetric) real operators.
//!
//! This crate computes a few eigenvalues and eigenvectors of an `n × n` real operator
//! `A` with the implicitly restarted Arnoldi method: it only ever applies `A` to
//! vectors, keeps an orthonormal Krylov basis of at most `ncv` vectors, and
//! repeatedly compresses it around the wanted part of the spectrum until `nev`
//! eigenpairs have converged. Eigenvalues of a real non-symmetric operator are complex
//! in general, so results are returned as [`faer::c64`].
//!
//! Built on the [`faer`] linear algebra framework, the solver accepts faer's dense and
//! sparse matrices directly, and any other operator through the
//! [`matrix::LinearOperator`] trait.
//!
//! ## Algorithm
//!
//! One outer iteration ([`GenEigsSolver::step`]) consists of:
//! - **Ritz extraction**: eigen-decompose the small Hessenberg matrix of the current
//!   Arnoldi factorization `A·V = V·H + f·eᵀ`;
//! - **Selection**: sort the Ritz values by the [`SelectionRule`];
//! - **Convergence test**: compare the residual estimates with the tolerance;
//! - **Implicit restart**: apply the unwanted Ritz values as shifted QR steps to `H`,
//!   shrink the factorization, and grow it back with `ncv - k` new operator
//!   applications.
//!
//! ## Example Usage
//!
//! The following example computes the three eigenvalues of smallest real part of a
//! sparse non-symmetric tridiagonal matrix.
//!
//! ```rust
//! use arnoldi_eigs::{ComputeInfo, EigsConfig, GenEigsSolver, SelectionRule};
//! use faer::sparse::{SparseColMat, Triplet};
//!
//! let n = 100;
//! let mut triplets = Vec::new();
//! for i in 0..n {
//!     triplets.push(Triplet { row: i, col: i, val: (i + 1) as f64 });
//!     if i + 1 < n {
//!         triplets.push(Triplet { row: i, col: i + 1, val: 0.5 });
//!         triplets.push(Triplet { row: i + 1, col: i, val: 0.1 });
//!     }
//! }
//! let a = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets).unwrap();
//!
//! let config = EigsConfig::new(3, 12).with_rule(SelectionRule::SmallestReal);
//! let mut solver = GenEigsSolver::new(&a, config);
//! solver.init(None).unwrap();
//! let nconv = solver.compute().unwrap();
//!
//! assert_eq!(solver.info(), ComputeInfo::Successful);
//! assert_eq!(nconv, 3);
//! let values = solver.eigenvalues().unwrap();
//! assert!(values[0].re < values[1].re && values[1].re < values[2].re);
//! ```
//!
//! ## Interior Eigenvalues
//!
//! The eigenvalues closest to a point `σ` are best computed on the transformed
//! operator `(A - σI)⁻¹`, see [`shift_invert::ShiftInvert`].
//!
//! ## Reproducibility
//!
//! All dense kernels run sequentially ([`faer::Par::Seq`]) and randomness only enters
//! through a seeded [`random::RandomSource`], so two runs with the same configuration
//! and start vector produce bit-identical results.

// Declare the modules that form the crate's API structure.
pub mod algorithms;
pub mod config;
pub mod error;
pub mod linalg;
pub mod matrix;
pub mod random;
pub mod shift_invert;
pub mod solvers;
pub mod utils;

// Re-export the main API for convenient access.
pub use algorithms::selection::SelectionRule;
pub use config::EigsConfig;
pub use error::{EigsError, EigsErrorKind};
pub use matrix::{FnOperator, LinearOperator};
pub use shift_invert::ShiftInvert;
pub use solvers::{ComputeInfo, GenEigsSolver, SolverState};
