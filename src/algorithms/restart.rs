//! Implicit restart with exact shifts.
//!
//! The unwanted Ritz values are used as shifts of QR steps on `H`. Each step filters
//! the direction of its shift out of the starting vector, so after `m - k` steps the
//! leading `k` columns of `V·Q` form an Arnoldi factorization whose starting vector is
//! `p(A)·v_0`, `p` being the polynomial with the unwanted values as roots. That
//! factorization is then grown back to `m` columns.
//!
//! Real shifts use an explicit single-shift step. A complex shift is applied together
//! with its conjugate as one Francis double-shift step, which keeps all the arithmetic
//! real.

use super::{arnoldi::ArnoldiFactorization, ritz::is_conjugate_pair};
use crate::{
    error::EigsError,
    linalg::{double_shift_qr::double_shift_step, hessenberg_qr::single_shift_step},
    matrix::LinearOperator,
    random::RandomSource,
};
use faer::{Mat, c64};

/// Shrinks the full factorization `fac` to `k` columns using `shifts[k..]` as exact
/// shifts, then extends it back to its capacity.
///
/// `shifts` holds all Ritz values of the current `H`, sorted with the wanted ones
/// first. A complex value followed by its conjugate is applied as a double shift;
/// any other value contributes its real part as a single shift.
pub fn implicit_restart<O, R>(
    fac: &mut ArnoldiFactorization,
    shifts: &[c64],
    k: usize,
    op: &O,
    random: &mut R,
    num_operations: &mut usize,
) -> Result<(), EigsError>
where
    O: LinearOperator + ?Sized,
    R: RandomSource + ?Sized,
{
    let m = fac.capacity();
    debug_assert_eq!(fac.len(), m);
    debug_assert_eq!(shifts.len(), m);
    debug_assert!(0 < k && k < m);

    let mut q = Mat::<f64>::identity(m, m);
    let mut i = k;
    while i < m {
        let theta = shifts[i];
        if i + 1 < m && is_conjugate_pair(theta, shifts[i + 1]) {
            double_shift_step(fac.hessenberg_mut(), 2.0 * theta.re, theta.norm_sqr(), &mut q);
            i += 2;
        } else {
            single_shift_step(fac.hessenberg_mut(), theta.re, &mut q);
            i += 1;
        }
    }

    fac.compress(q.as_ref(), k);
    fac.extend_to(m, op, random, num_operations)
}
