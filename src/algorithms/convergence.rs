//! Convergence tests and the adaptive restart size.

use super::{NEAR_ZERO, precision, ritz::is_conjugate_pair};
use faer::c64;

/// Flags the leading `nev` sorted pairs whose residual estimate satisfies
/// `ρ < tol·max(ε^(2/3), |θ|)`.
pub fn converged_flags(
    values: &[c64],
    residuals: &[f64],
    nev: usize,
    tolerance: f64,
) -> Vec<bool> {
    let prec = precision();
    values
        .iter()
        .zip(residuals)
        .take(nev)
        .map(|(theta, &rho)| rho < tolerance * prec.max(theta.norm()))
        .collect()
}

/// Number of converged wanted pairs.
pub fn num_converged(values: &[c64], residuals: &[f64], nev: usize, tolerance: f64) -> usize {
    converged_flags(values, residuals, nev, tolerance)
        .into_iter()
        .filter(|&c| c)
        .count()
}

/// Chooses how many sorted Ritz pairs the restart keeps.
///
/// Keeping more than `nev` pairs moves the unwanted shifts away from the wanted part
/// of the spectrum and speeds up convergence (ARPACK `dnaup2`):
///
/// - unwanted pairs whose residual already vanished are kept;
/// - half of the remaining room, up to `nconv`, is added;
/// - a lone wanted value is given a larger subspace;
/// - at least two shifts are applied unless `nev` itself leaves less room;
/// - a conjugate pair is never split across the boundary.
pub fn adjusted_nev(
    values: &[c64],
    residuals: &[f64],
    nev: usize,
    ncv: usize,
    nconv: usize,
) -> usize {
    debug_assert!(0 < nev && nev < ncv);
    debug_assert_eq!(values.len(), ncv);

    let mut k = nev + residuals[nev..].iter().filter(|&&rho| rho < NEAR_ZERO).count();
    k += nconv.min(ncv.saturating_sub(k) / 2);
    if k == 1 && ncv >= 6 {
        k = ncv / 2;
    } else if k == 1 && ncv > 3 {
        k = 2;
    }
    k = k.min((ncv - 2).max(nev));

    if k + 1 < ncv && is_conjugate_pair(values[k - 1], values[k]) {
        k += 1;
    }
    k
}
