//! Solver configuration.

use crate::{
    algorithms::selection::SelectionRule,
    error::{EigsError, EigsErrorKind},
};
use serde::{Deserialize, Serialize};

/// Default relative tolerance of the convergence test.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Parameters of a [`crate::solvers::GenEigsSolver`].
///
/// ```
/// use arnoldi_eigs::{EigsConfig, SelectionRule};
///
/// let config = EigsConfig::new(3, 8)
///     .with_rule(SelectionRule::SmallestReal)
///     .with_tolerance(1e-12);
/// assert!(config.validate(100).is_ok());
/// assert_eq!(config.max_iterations(), 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigsConfig {
    /// Number of wanted eigenvalues (`k`).
    pub nev: usize,
    /// Maximum dimension of the Krylov subspace (`m`). Larger values trade memory and
    /// work per restart for fewer restarts; `2·nev + 1` or more is a good start.
    pub ncv: usize,
    /// Which end of the spectrum is wanted.
    pub rule: SelectionRule,
    /// Relative tolerance of the convergence test.
    pub tolerance: f64,
    /// Outer iteration budget. `None` selects `1000·⌈ncv / (ncv - nev)⌉`.
    pub max_iterations: Option<usize>,
    /// Seed of the default [`crate::random::SeededRandom`] source.
    pub seed: u64,
}

impl EigsConfig {
    /// Creates a configuration for `nev` eigenvalues with a Krylov subspace of
    /// dimension `ncv`, and defaults for everything else.
    pub fn new(nev: usize, ncv: usize) -> Self {
        Self {
            nev,
            ncv,
            rule: SelectionRule::default(),
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: None,
            seed: 0,
        }
    }

    pub fn with_rule(mut self, rule: SelectionRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The effective iteration budget.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
            .unwrap_or_else(|| default_max_iterations(self.nev, self.ncv))
    }

    /// Checks `1 ≤ nev < ncv < n`, a finite positive tolerance and a non-zero
    /// iteration budget for an operator of dimension `n`.
    pub fn validate(&self, n: usize) -> Result<(), EigsError> {
        let invalid = |msg: String| -> Result<(), EigsError> {
            Err(EigsErrorKind::InvalidConfiguration(msg).into())
        };
        if self.nev == 0 {
            return invalid("`nev` must be at least 1".to_string());
        }
        if self.nev >= self.ncv {
            return invalid(format!(
                "`nev` ({}) must be smaller than `ncv` ({})",
                self.nev, self.ncv
            ));
        }
        if self.ncv >= n {
            return invalid(format!(
                "`ncv` ({}) must be smaller than the operator dimension ({n})",
                self.ncv
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid(format!(
                "`tolerance` must be finite and positive, got {}",
                self.tolerance
            ));
        }
        if self.max_iterations == Some(0) {
            return invalid("`max_iterations` must be at least 1".to_string());
        }
        Ok(())
    }
}

/// `1000·⌈ncv / (ncv - nev)⌉`: the fewer shifts per restart, the more restarts are
/// allowed.
pub fn default_max_iterations(nev: usize, ncv: usize) -> usize {
    let shifts = ncv.saturating_sub(nev).max(1);
    1000 * ncv.div_ceil(shifts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EigsConfig::new(3, 6);
        assert_eq!(config.rule, SelectionRule::LargestMagnitude);
        assert_eq!(config.tolerance, 1e-10);
        assert_eq!(config.seed, 0);
        assert_eq!(config.max_iterations(), 2000);
        assert_eq!(config.clone().with_max_iterations(7).max_iterations(), 7);
        assert_eq!(default_max_iterations(20, 50), 2000);
        assert_eq!(default_max_iterations(9, 10), 10_000);
    }

    #[test]
    fn test_validation_messages() {
        let message = |config: EigsConfig, n: usize| config.validate(n).unwrap_err().to_string();

        assert_eq!(
            message(EigsConfig::new(0, 4), 10),
            "Invalid configuration: `nev` must be at least 1"
        );
        assert_eq!(
            message(EigsConfig::new(4, 4), 10),
            "Invalid configuration: `nev` (4) must be smaller than `ncv` (4)"
        );
        assert_eq!(
            message(EigsConfig::new(3, 10), 10),
            "Invalid configuration: `ncv` (10) must be smaller than the operator dimension (10)"
        );
        assert!(
            message(EigsConfig::new(3, 6).with_tolerance(f64::NAN), 10)
                .contains("`tolerance` must be finite and positive")
        );
        assert!(
            EigsConfig::new(3, 6)
                .with_max_iterations(0)
                .validate(10)
                .unwrap_err()
                .is_configuration_error()
        );
        assert!(EigsConfig::new(9, 10).validate(11).is_ok());
    }
}
