//! Arnoldi factorization builder.
//!
//! An Arnoldi factorization of length `j` of an `n × n` operator `A` is a triple
//! `(V_j, H_j, f_j)` with
//!
//! ```text
//! A·V_j = V_j·H_j + f_j·e_jᵀ,     V_jᵀ·V_j = I,     V_jᵀ·f_j = 0,
//! ```
//!
//! where the columns of `V_j` span the Krylov subspace `K_j(A, v_0)` and `H_j` is a
//! `j × j` upper-Hessenberg matrix: the restriction of `A` to that subspace. The
//! norm `‖f_j‖` is the next subdiagonal entry `H[j, j-1]` the factorization would get
//! if it were extended.
//!
//! [`ArnoldiFactorization`] preallocates `V` and `H` for the maximum length `ncv`
//! and grows one column per operator application. Each new direction is made
//! orthogonal to the basis with modified Gram-Schmidt, followed by classical
//! correction passes whenever the first pass cancelled most of the vector
//! ("twice is enough").
//!
//! ## Breakdown
//!
//! When the new residual vanishes relative to the scale of the operator, the current
//! basis spans an invariant subspace. This is not an error: the subdiagonal entry is
//! set to exactly zero, which decouples `H`, and the basis continues from a random
//! vector orthogonalized against the existing columns. Only when
//! [`MAX_BREAKDOWN_DRAWS`] consecutive draws all lie (numerically) inside the span of
//! the basis is [`EigsErrorKind::Breakdown`] returned.

use super::{NEAR_ZERO, precision};
use crate::{
    error::{EigsError, EigsErrorKind},
    matrix::LinearOperator,
    random::{RandomSource, restart_stream},
};
use faer::{Accum, Col, ColRef, Mat, MatRef, Par, linalg::matmul::matmul};

/// Re-orthogonalize when `‖f‖ ≤ 0.717·‖h‖` after the first pass. The constant is
/// `1/√2` rounded up, as in ARPACK.
const REORTHOGONALIZATION_THRESHOLD: f64 = 0.717;

/// Upper bound on the classical correction passes per column.
const MAX_REORTHOGONALIZATION_PASSES: usize = 5;

/// Number of random vectors tried before a breakdown is declared unrecoverable.
pub const MAX_BREAKDOWN_DRAWS: usize = 5;

#[inline]
fn dot(x: ColRef<'_, f64>, y: ColRef<'_, f64>) -> f64 {
    (0..x.nrows()).map(|i| x[i] * y[i]).sum()
}

// y += alpha * x
#[inline]
fn axpy(alpha: f64, x: ColRef<'_, f64>, y: &mut Col<f64>) {
    for i in 0..y.nrows() {
        y[i] += alpha * x[i];
    }
}

/// A growable Arnoldi factorization `A·V = V·H + f·eᵀ` with fixed capacity.
#[derive(Debug, Clone)]
pub struct ArnoldiFactorization {
    /// Basis, `n × capacity`. Only the first `len` columns are meaningful.
    v: Mat<f64>,
    /// Hessenberg matrix, `capacity × capacity`. Entries outside the leading
    /// `len × len` block are zero while the factorization grows.
    h: Mat<f64>,
    /// Residual vector, orthogonal to the basis.
    f: Col<f64>,
    beta: f64,
    len: usize,
    /// Largest `‖A·v_j‖` seen so far; breakdown is judged relative to it.
    scale: f64,
    num_breakdowns: usize,
}

impl ArnoldiFactorization {
    /// Allocates an empty factorization for an `n × n` operator and at most
    /// `capacity` basis vectors.
    pub fn new(n: usize, capacity: usize) -> Self {
        Self {
            v: Mat::zeros(n, capacity),
            h: Mat::zeros(capacity, capacity),
            f: Col::zeros(n),
            beta: 0.0,
            len: 0,
            scale: 0.0,
            num_breakdowns: 0,
        }
    }

    /// Dimension `n` of the operator.
    pub fn dim(&self) -> usize {
        self.v.nrows()
    }

    /// Maximum number of basis vectors.
    pub fn capacity(&self) -> usize {
        self.v.ncols()
    }

    /// Current length of the factorization.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The orthonormal basis `V`, `n × len`.
    pub fn basis(&self) -> MatRef<'_, f64> {
        self.v.as_ref().get(.., 0..self.len)
    }

    /// The Hessenberg matrix `H`, `len × len`.
    pub fn hessenberg(&self) -> MatRef<'_, f64> {
        self.h.as_ref().get(0..self.len, 0..self.len)
    }

    /// The residual vector `f`.
    pub fn residual(&self) -> ColRef<'_, f64> {
        self.f.as_ref()
    }

    /// `‖f‖`.
    pub fn residual_norm(&self) -> f64 {
        self.beta
    }

    /// Number of breakdowns recovered from since [`ArnoldiFactorization::start`].
    pub fn num_breakdowns(&self) -> usize {
        self.num_breakdowns
    }

    /// Full-capacity Hessenberg storage, transformed in place by the restart.
    pub(crate) fn hessenberg_mut(&mut self) -> &mut Mat<f64> {
        &mut self.h
    }

    /// Resets the factorization and builds its first column from the unit vector `v0`.
    ///
    /// `num_operations` is incremented once per operator application.
    pub fn start<O>(
        &mut self,
        op: &O,
        v0: ColRef<'_, f64>,
        num_operations: &mut usize,
    ) -> Result<(), EigsError>
    where
        O: LinearOperator + ?Sized,
    {
        let (n, capacity) = (self.dim(), self.capacity());
        if v0.nrows() != n {
            return Err(EigsErrorKind::DimensionMismatch {
                operator_cols: n,
                vector_rows: v0.nrows(),
            }
            .into());
        }
        self.h = Mat::zeros(capacity, capacity);
        self.f = Col::zeros(n);
        self.beta = 0.0;
        self.len = 0;
        self.scale = 0.0;
        self.num_breakdowns = 0;

        self.v.col_mut(0).copy_from(v0);
        self.arnoldi_column(0, op, num_operations)
    }

    /// Grows the factorization from its current length to `to` columns.
    ///
    /// # Errors
    /// Operator failures are returned unchanged as [`EigsErrorKind::Operator`], and an
    /// unrecoverable breakdown as [`EigsErrorKind::Breakdown`].
    pub fn extend_to<O, R>(
        &mut self,
        to: usize,
        op: &O,
        random: &mut R,
        num_operations: &mut usize,
    ) -> Result<(), EigsError>
    where
        O: LinearOperator + ?Sized,
        R: RandomSource + ?Sized,
    {
        debug_assert!(!self.is_empty(), "`start` must be called before `extend_to`");
        debug_assert!(to <= self.capacity());
        if to <= self.len {
            return Ok(());
        }
        self.clear_trailing();

        let n = self.dim();
        while self.len < to {
            let j = self.len;
            if self.is_breakdown() {
                self.replace_direction(j, random)?;
                self.h[(j, j - 1)] = 0.0;
            } else {
                let inv_beta = 1.0 / self.beta;
                for i in 0..n {
                    self.v[(i, j)] = self.f[i] * inv_beta;
                }
                self.h[(j, j - 1)] = self.beta;
            }
            self.arnoldi_column(j, op, num_operations)?;
        }
        Ok(())
    }

    /// Shrinks a factorization of length `m` to length `k` after `H` has been
    /// overwritten with `QᵀHQ`.
    ///
    /// `Q` must be the accumulated orthogonal factor of the shifted QR steps, so that
    /// its last row vanishes before column `k - 1`. The new factorization is
    /// `A·(VQ)_k = (VQ)_k·(QᵀHQ)_k + f⁺·e_kᵀ` with
    /// `f⁺ = (VQ)_k·H⁺[k, k-1] + f·Q[m-1, k-1]`.
    pub(crate) fn compress(&mut self, q: MatRef<'_, f64>, k: usize) {
        let (n, m) = (self.dim(), self.len);
        debug_assert!(0 < k && k < m);
        debug_assert_eq!(q.nrows(), m);

        // Column k of V·Q is only needed for the new residual.
        let mut vq = Mat::<f64>::zeros(n, k + 1);
        matmul(
            vq.as_mut(),
            Accum::Replace,
            self.basis(),
            q.get(.., 0..k + 1),
            1.0,
            Par::Seq,
        );

        let sigma = q[(m - 1, k - 1)];
        let h_sub = self.h[(k, k - 1)];
        let f_new = Col::from_fn(n, |i| vq[(i, k)] * h_sub + self.f[i] * sigma);

        self.v
            .as_mut()
            .get_mut(.., 0..k)
            .copy_from(vq.as_ref().get(.., 0..k));
        self.beta = f_new.norm_l2();
        self.f = f_new;
        self.len = k;
    }

    fn is_breakdown(&self) -> bool {
        self.beta <= precision() * self.scale || self.beta < NEAR_ZERO
    }

    // Zeroes H outside the leading len × len block.
    fn clear_trailing(&mut self) {
        let capacity = self.capacity();
        for j in 0..capacity {
            let first_row = if j < self.len { self.len } else { 0 };
            for i in first_row..capacity {
                self.h[(i, j)] = 0.0;
            }
        }
    }

    // Computes column j of H and the new residual from the basis vector v_j.
    fn arnoldi_column<O>(
        &mut self,
        j: usize,
        op: &O,
        num_operations: &mut usize,
    ) -> Result<(), EigsError>
    where
        O: LinearOperator + ?Sized,
    {
        let n = self.dim();
        *num_operations += 1;
        let mut w = op.apply(self.v.col(j)).map_err(EigsErrorKind::Operator)?;
        if w.nrows() != n {
            return Err(EigsErrorKind::DimensionMismatch {
                operator_cols: n,
                vector_rows: w.nrows(),
            }
            .into());
        }
        let w_norm = w.norm_l2();
        self.scale = self.scale.max(w_norm);

        for i in 0..=j {
            let hij = dot(self.v.col(i), w.as_ref());
            axpy(-hij, self.v.col(i), &mut w);
            self.h[(i, j)] = hij;
        }
        let mut beta = w.norm_l2();
        let h_norm = (0..=j)
            .map(|i| self.h[(i, j)] * self.h[(i, j)])
            .sum::<f64>()
            .sqrt();

        if beta <= REORTHOGONALIZATION_THRESHOLD * h_norm {
            let prec = precision();
            let mut proj = vec![0.0; j + 1];
            for _ in 0..MAX_REORTHOGONALIZATION_PASSES {
                let mut ortho_err = 0.0f64;
                for (i, p) in proj.iter_mut().enumerate() {
                    *p = dot(self.v.col(i), w.as_ref());
                    ortho_err = ortho_err.max(p.abs());
                }
                if ortho_err <= prec * beta {
                    break;
                }
                // What is left is rounding noise: treat the column as rank deficient.
                if beta < prec.sqrt() * w_norm {
                    w = Col::zeros(n);
                    beta = 0.0;
                    break;
                }
                for (i, &p) in proj.iter().enumerate() {
                    axpy(-p, self.v.col(i), &mut w);
                    self.h[(i, j)] += p;
                }
                beta = w.norm_l2();
            }
        }

        self.f = w;
        self.beta = beta;
        self.len = j + 1;
        Ok(())
    }

    // Writes a random unit vector orthogonal to v_0..v_{j-1} into column j.
    fn replace_direction<R>(&mut self, j: usize, random: &mut R) -> Result<(), EigsError>
    where
        R: RandomSource + ?Sized,
    {
        let n = self.dim();
        let prec = precision();
        log::debug!(
            "Invariant subspace of dimension {j} found (beta = {:e}); drawing a new direction.",
            self.beta
        );

        for attempt in 0..MAX_BREAKDOWN_DRAWS {
            let mut r = random.random_vector(n, restart_stream(j, attempt));
            if r.nrows() != n {
                return Err(EigsErrorKind::DimensionMismatch {
                    operator_cols: n,
                    vector_rows: r.nrows(),
                }
                .into());
            }
            let r_norm = r.norm_l2();
            if r_norm <= 0.0 || !r_norm.is_finite() {
                continue;
            }
            for _ in 0..2 {
                for i in 0..j {
                    let c = dot(self.v.col(i), r.as_ref());
                    axpy(-c, self.v.col(i), &mut r);
                }
            }
            let norm = r.norm_l2();
            if norm > prec * r_norm {
                for i in 0..n {
                    self.v[(i, j)] = r[i] / norm;
                }
                self.num_breakdowns += 1;
                return Ok(());
            }
        }

        log::warn!(
            "Arnoldi breakdown at column {j}: {MAX_BREAKDOWN_DRAWS} random directions all fell inside the current basis."
        );
        Err(EigsErrorKind::Breakdown { step: j }.into())
    }
}
