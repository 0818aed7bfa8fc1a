//! This module provides the high-level API: [`GenEigsSolver`], a partial eigensolver
//! for general real operators based on the implicitly restarted Arnoldi method.
//!
//! The solver is an explicit state machine:
//!
//! ```text
//! Uninitialized --init()--> Initialized --step()/compute()--> Converged
//!                                                           | NotConverging
//!                                                           | NumericalIssue
//! ```
//!
//! [`GenEigsSolver::init`] validates the configuration before the operator is ever
//! applied and builds the first full factorization. Each [`GenEigsSolver::step`] is one
//! outer iteration: extract and sort the Ritz pairs, test convergence, and restart.
//! [`GenEigsSolver::compute`] loops over `step` until a terminal state is reached, so a
//! caller that needs to stop early can drive `step` itself.

use crate::{
    algorithms::{
        NEAR_ZERO,
        arnoldi::ArnoldiFactorization,
        convergence::{adjusted_nev, converged_flags},
        restart::implicit_restart,
        ritz::RitzPairs,
    },
    config::EigsConfig,
    error::{EigsError, EigsErrorKind},
    matrix::LinearOperator,
    random::{INITIAL_STREAM, RandomSource, SeededRandom},
};
use faer::{Accum, Col, ColRef, Mat, MatRef, Par, c64, linalg::matmul::matmul};

/// The position of a solver in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// `init` has not been called, or the last run was aborted by an operator error.
    Uninitialized,
    /// A factorization exists and the iteration can proceed.
    Initialized,
    /// All wanted eigenpairs converged.
    Converged,
    /// The iteration budget was exhausted; the converged subset is available.
    NotConverging,
    /// The algorithm could not proceed (unrecoverable breakdown or dense eigensolver
    /// failure).
    NumericalIssue,
}

impl SolverState {
    /// Returns `true` for the states in which results can be queried.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolverState::Converged | SolverState::NotConverging | SolverState::NumericalIssue
        )
    }
}

/// Outcome of the last computation, as reported by [`GenEigsSolver::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeInfo {
    Successful,
    NotComputed,
    NotConverging,
    NumericalIssue,
}

/// Computes a few eigenpairs of a general real square operator.
///
/// # Example
///
/// ```
/// use arnoldi_eigs::{EigsConfig, GenEigsSolver, SelectionRule, ComputeInfo};
/// use faer::Mat;
///
/// // Upper bidiagonal, so the eigenvalues are the diagonal entries 1..=20.
/// let a = Mat::from_fn(20, 20, |i, j| {
///     if i == j { (i + 1) as f64 } else if j == i + 1 { 1.0 } else { 0.0 }
/// });
/// let config = EigsConfig::new(2, 8).with_rule(SelectionRule::LargestReal);
/// let mut solver = GenEigsSolver::new(&a, config);
/// solver.init(None).unwrap();
/// let nconv = solver.compute().unwrap();
///
/// assert_eq!(nconv, 2);
/// assert_eq!(solver.info(), ComputeInfo::Successful);
/// let values = solver.eigenvalues().unwrap();
/// assert!((values[0].re - 20.0).abs() < 1e-8);
/// assert!((values[1].re - 19.0).abs() < 1e-8);
/// ```
pub struct GenEigsSolver<'a, O, R = SeededRandom>
where
    O: LinearOperator + ?Sized,
    R: RandomSource,
{
    op: &'a O,
    config: EigsConfig,
    random: R,
    fac: ArnoldiFactorization,
    state: SolverState,
    /// The caller's starting vector, kept to restart from the same seed.
    seed: Option<Col<f64>>,
    max_iterations: usize,
    tolerance: f64,
    num_iterations: usize,
    num_operations: usize,
    num_restarts: usize,
    eigenvalues: Vec<c64>,
    eigenvectors: Mat<c64>,
    residuals: Vec<f64>,
}

impl<'a, O> GenEigsSolver<'a, O, SeededRandom>
where
    O: LinearOperator + ?Sized,
{
    /// Creates a solver drawing its random vectors from
    /// [`SeededRandom::new(config.seed)`](SeededRandom::new).
    pub fn new(op: &'a O, config: EigsConfig) -> Self {
        let random = SeededRandom::new(config.seed);
        Self::with_random_source(op, config, random)
    }
}

impl<'a, O, R> GenEigsSolver<'a, O, R>
where
    O: LinearOperator + ?Sized,
    R: RandomSource,
{
    /// Creates a solver with a custom source of random vectors.
    pub fn with_random_source(op: &'a O, config: EigsConfig, random: R) -> Self {
        let max_iterations = config.max_iterations();
        let tolerance = config.tolerance;
        Self {
            op,
            config,
            random,
            fac: ArnoldiFactorization::new(0, 0),
            state: SolverState::Uninitialized,
            seed: None,
            max_iterations,
            tolerance,
            num_iterations: 0,
            num_operations: 0,
            num_restarts: 0,
            eigenvalues: Vec::new(),
            eigenvectors: Mat::zeros(0, 0),
            residuals: Vec::new(),
        }
    }

    /// Validates the configuration, resets all counters and builds the initial
    /// Arnoldi factorization from `seed`, or from a random vector when `seed` is
    /// `None`. May be called again at any time to start over.
    ///
    /// # Errors
    /// Configuration errors are returned before the operator is applied. Operator
    /// errors are returned unchanged and leave the solver uninitialized. A numerical
    /// failure is not an error: it moves the solver to
    /// [`SolverState::NumericalIssue`].
    pub fn init(&mut self, seed: Option<ColRef<'_, f64>>) -> Result<(), EigsError> {
        self.state = SolverState::Uninitialized;
        self.clear_results();
        self.num_iterations = 0;
        self.num_operations = 0;
        self.num_restarts = 0;

        let (n, ncols) = (self.op.nrows(), self.op.ncols());
        if n != ncols {
            return Err(EigsErrorKind::NotSquare { nrows: n, ncols }.into());
        }
        self.config.validate(n)?;

        let v0 = match seed {
            Some(seed) => seed.to_owned(),
            None => self.random.random_vector(n, INITIAL_STREAM),
        };
        if v0.nrows() != n {
            return Err(EigsErrorKind::DimensionMismatch {
                operator_cols: n,
                vector_rows: v0.nrows(),
            }
            .into());
        }
        let norm = v0.norm_l2();
        if !norm.is_finite() {
            return Err(EigsErrorKind::InvalidConfiguration(
                "the initial vector has non-finite entries".to_string(),
            )
            .into());
        }
        if norm < NEAR_ZERO {
            return Err(EigsErrorKind::ZeroInitialVector.into());
        }
        let unit = Col::from_fn(n, |i| v0[i] / norm);
        self.seed = seed.map(|_| v0);
        self.max_iterations = self.config.max_iterations();
        self.tolerance = self.config.tolerance;

        log::debug!(
            "Initializing Arnoldi factorization: n = {n}, nev = {}, ncv = {}, rule = {}.",
            self.config.nev,
            self.config.ncv,
            self.config.rule
        );
        self.fac = ArnoldiFactorization::new(n, self.config.ncv);
        match self.build_factorization(unit.as_ref()) {
            Ok(()) => {
                self.state = SolverState::Initialized;
                Ok(())
            }
            Err(err) => self.absorb_numerical_issue(err).map(|_| ()),
        }
    }

    /// Performs one outer iteration and returns the new state.
    ///
    /// In a terminal state this is a no-op that returns the state unchanged.
    pub fn step(&mut self) -> Result<SolverState, EigsError> {
        match self.state {
            SolverState::Uninitialized => Err(EigsErrorKind::NotInitialized.into()),
            SolverState::Initialized => match self.outer_iteration() {
                Ok(state) => Ok(state),
                Err(err) => self.absorb_numerical_issue(err),
            },
            terminal => Ok(terminal),
        }
    }

    /// Runs the iteration to completion with the configured budget and tolerance and
    /// returns the number of converged eigenpairs (at most `nev`).
    pub fn compute(&mut self) -> Result<usize, EigsError> {
        let (max_iterations, tolerance) = (self.config.max_iterations(), self.config.tolerance);
        self.compute_with(max_iterations, tolerance)
    }

    /// Like [`GenEigsSolver::compute`], with an explicit iteration budget and
    /// tolerance.
    ///
    /// Called in a terminal state, the solver is first re-initialized from the same
    /// seed, so repeated calls give identical results.
    pub fn compute_with(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<usize, EigsError> {
        if max_iterations == 0 {
            return Err(EigsErrorKind::InvalidConfiguration(
                "`max_iterations` must be at least 1".to_string(),
            )
            .into());
        }
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(EigsErrorKind::InvalidConfiguration(format!(
                "`tolerance` must be finite and positive, got {tolerance}"
            ))
            .into());
        }
        match self.state {
            SolverState::Uninitialized => return Err(EigsErrorKind::NotInitialized.into()),
            state if state.is_terminal() => {
                // Cloned, so a failing re-initialization still leaves the vector in place.
                let seed = self.seed.clone();
                self.init(seed.as_ref().map(|s| s.as_ref()))?;
            }
            _ => {}
        }
        self.max_iterations = max_iterations;
        self.tolerance = tolerance;

        while !self.step()?.is_terminal() {}
        Ok(self.eigenvalues.len())
    }

    /// The converged eigenvalues, ordered by the selection rule.
    pub fn eigenvalues(&self) -> Result<&[c64], EigsError> {
        self.check_results()?;
        Ok(&self.eigenvalues)
    }

    /// The eigenvectors matching [`GenEigsSolver::eigenvalues`], one column each.
    ///
    /// Columns have unit 2-norm, and their entry of largest modulus (the first one on
    /// ties) is real and positive.
    pub fn eigenvectors(&self) -> Result<MatRef<'_, c64>, EigsError> {
        self.check_results()?;
        Ok(self.eigenvectors.as_ref())
    }

    /// The residual estimates `‖A·x - λ·x‖` of the returned eigenpairs.
    pub fn residual_estimates(&self) -> Result<&[f64], EigsError> {
        self.check_results()?;
        Ok(&self.residuals)
    }

    pub fn info(&self) -> ComputeInfo {
        match self.state {
            SolverState::Converged => ComputeInfo::Successful,
            SolverState::NotConverging => ComputeInfo::NotConverging,
            SolverState::NumericalIssue => ComputeInfo::NumericalIssue,
            SolverState::Uninitialized | SolverState::Initialized => ComputeInfo::NotComputed,
        }
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Number of outer iterations (convergence checks) since the last `init`.
    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    /// Number of operator applications since the last `init`.
    pub fn num_operations(&self) -> usize {
        self.num_operations
    }

    /// Number of implicit restarts since the last `init`.
    pub fn num_restarts(&self) -> usize {
        self.num_restarts
    }

    pub fn config(&self) -> &EigsConfig {
        &self.config
    }

    fn build_factorization(&mut self, v0: ColRef<'_, f64>) -> Result<(), EigsError> {
        self.fac.start(self.op, v0, &mut self.num_operations)?;
        self.fac.extend_to(
            self.config.ncv,
            self.op,
            &mut self.random,
            &mut self.num_operations,
        )
    }

    fn outer_iteration(&mut self) -> Result<SolverState, EigsError> {
        let (nev, ncv) = (self.config.nev, self.config.ncv);
        let ritz = RitzPairs::extract(&self.fac)?.sorted(self.config.rule);
        let flags = converged_flags(ritz.values(), ritz.residuals(), nev, self.tolerance);
        let nconv = flags.iter().filter(|&&c| c).count();
        self.num_iterations += 1;

        if nconv >= nev {
            self.finish(SolverState::Converged, &ritz, &flags);
            return Ok(self.state);
        }
        if self.num_restarts >= self.max_iterations {
            self.finish(SolverState::NotConverging, &ritz, &flags);
            return Ok(self.state);
        }

        let k = adjusted_nev(ritz.values(), ritz.residuals(), nev, ncv, nconv);
        log::debug!(
            "Iteration {}: {nconv}/{nev} converged, restarting with {k} kept Ritz pairs.",
            self.num_iterations
        );
        implicit_restart(
            &mut self.fac,
            ritz.values(),
            k,
            self.op,
            &mut self.random,
            &mut self.num_operations,
        )?;
        self.num_restarts += 1;
        Ok(self.state)
    }

    // Numerical failures become a terminal state; anything else aborts the run.
    fn absorb_numerical_issue(&mut self, err: EigsError) -> Result<SolverState, EigsError> {
        if err.is_numerical_issue() {
            log::warn!(
                "Stopping after {} iterations and {} operations: {err}",
                self.num_iterations,
                self.num_operations
            );
            self.clear_results();
            self.state = SolverState::NumericalIssue;
            Ok(self.state)
        } else {
            self.state = SolverState::Uninitialized;
            Err(err)
        }
    }

    fn finish(&mut self, state: SolverState, ritz: &RitzPairs, flags: &[bool]) {
        let selected: Vec<usize> = (0..flags.len()).filter(|&i| flags[i]).collect();
        self.eigenvalues = selected.iter().map(|&i| ritz.values()[i]).collect();
        self.residuals = selected.iter().map(|&i| ritz.residuals()[i]).collect();
        self.eigenvectors = self.ritz_vectors(ritz, &selected);
        self.state = state;

        match state {
            SolverState::Converged => log::info!(
                "Converged {} eigenpairs in {} iterations ({} operations, {} restarts).",
                self.eigenvalues.len(),
                self.num_iterations,
                self.num_operations,
                self.num_restarts
            ),
            _ => log::info!(
                "Iteration budget of {} restarts exhausted with {}/{} eigenpairs converged.",
                self.max_iterations,
                self.eigenvalues.len(),
                self.config.nev
            ),
        }
    }

    // x = V·y for the selected coordinate vectors, computed as two real products.
    fn ritz_vectors(&self, ritz: &RitzPairs, columns: &[usize]) -> Mat<c64> {
        let v = self.fac.basis();
        let y = ritz.vectors();
        let (n, len, p) = (v.nrows(), v.ncols(), columns.len());

        let y_re = Mat::from_fn(len, p, |i, j| y[(i, columns[j])].re);
        let y_im = Mat::from_fn(len, p, |i, j| y[(i, columns[j])].im);
        let mut x_re = Mat::<f64>::zeros(n, p);
        let mut x_im = Mat::<f64>::zeros(n, p);
        matmul(x_re.as_mut(), Accum::Replace, v, y_re.as_ref(), 1.0, Par::Seq);
        matmul(x_im.as_mut(), Accum::Replace, v, y_im.as_ref(), 1.0, Par::Seq);

        let mut x = Mat::from_fn(n, p, |i, j| c64::new(x_re[(i, j)], x_im[(i, j)]));
        for j in 0..p {
            normalize_with_phase(&mut x, j);
        }
        x
    }

    fn check_results(&self) -> Result<(), EigsError> {
        if !self.state.is_terminal() {
            return Err(EigsErrorKind::NotComputed.into());
        }
        if self.eigenvalues.is_empty() {
            return Err(EigsErrorKind::NoConvergedPairs.into());
        }
        Ok(())
    }

    fn clear_results(&mut self) {
        self.eigenvalues.clear();
        self.residuals.clear();
        self.eigenvectors = Mat::zeros(0, 0);
    }
}

// Scales column j of x to unit norm, with its largest-modulus entry real and positive.
fn normalize_with_phase(x: &mut Mat<c64>, j: usize) {
    let n = x.nrows();
    let mut pivot = 0;
    let mut pivot_abs = -1.0;
    let mut norm_sqr = 0.0;
    for i in 0..n {
        let a = x[(i, j)].norm();
        norm_sqr += a * a;
        if a > pivot_abs {
            pivot = i;
            pivot_abs = a;
        }
    }
    let norm = norm_sqr.sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return;
    }
    // Dividing by x_p / |x_p| rotates x_p onto the positive real axis.
    let phase = x[(pivot, j)] / pivot_abs;
    let scale = phase.conj() / norm;
    for i in 0..n {
        x[(i, j)] *= scale;
    }
    x[(pivot, j)] = c64::new(x[(pivot, j)].norm(), 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::selection::SelectionRule, matrix::FnOperator};
    use faer::mat;
    use std::cell::Cell;

    fn bidiagonal(n: usize) -> Mat<f64> {
        Mat::from_fn(n, n, |i, j| {
            if i == j {
                (i + 1) as f64
            } else if j == i + 1 {
                1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_state_machine() {
        let a = bidiagonal(30);
        let mut solver = GenEigsSolver::new(&a, EigsConfig::new(3, 10));
        assert_eq!(solver.state(), SolverState::Uninitialized);
        assert!(matches!(
            solver.step().unwrap_err().kind(),
            EigsErrorKind::NotInitialized
        ));
        assert!(matches!(
            solver.eigenvalues().unwrap_err().kind(),
            EigsErrorKind::NotComputed
        ));

        solver.init(None).unwrap();
        assert_eq!(solver.state(), SolverState::Initialized);
        assert_eq!(solver.num_operations(), 10);
        assert_eq!(solver.info(), ComputeInfo::NotComputed);

        let mut state = solver.state();
        while !state.is_terminal() {
            state = solver.step().unwrap();
        }
        assert_eq!(state, SolverState::Converged);
        assert_eq!(solver.step().unwrap(), SolverState::Converged);
        assert_eq!(solver.num_iterations(), solver.num_restarts() + 1);
        assert_eq!(solver.eigenvalues().unwrap().len(), 3);
    }

    #[test]
    fn test_eigenvectors_follow_the_phase_convention() {
        let a = bidiagonal(25);
        let config = EigsConfig::new(4, 12).with_rule(SelectionRule::LargestMagnitude);
        let mut solver = GenEigsSolver::new(&a, config);
        solver.init(None).unwrap();
        solver.compute().unwrap();

        let vectors = solver.eigenvectors().unwrap();
        for j in 0..vectors.ncols() {
            let col: Vec<c64> = (0..vectors.nrows()).map(|i| vectors[(i, j)]).collect();
            let norm = col.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
            let mut p = 0;
            for i in 1..col.len() {
                if col[i].norm() > col[p].norm() {
                    p = i;
                }
            }
            let max = col[p].norm();
            assert!(col[p].re > 0.0);
            assert_eq!(col[p].im, 0.0);
            assert!((col[p].re - max).abs() < 1e-15);
        }
    }

    #[test]
    fn test_not_converging_returns_converged_subset() {
        let a = bidiagonal(200);
        let config = EigsConfig::new(6, 8)
            .with_rule(SelectionRule::SmallestReal)
            .with_max_iterations(1);
        let mut solver = GenEigsSolver::new(&a, config);
        solver.init(None).unwrap();
        let nconv = solver.compute().unwrap();

        assert_eq!(solver.info(), ComputeInfo::NotConverging);
        assert!(nconv < 6);
        assert_eq!(solver.num_restarts(), 1);
        match solver.eigenvalues() {
            Ok(values) => assert_eq!(values.len(), nconv),
            Err(err) => assert!(matches!(err.kind(), EigsErrorKind::NoConvergedPairs)),
        }
    }

    #[test]
    fn test_rejects_non_square_and_bad_seeds() {
        let rect = Mat::<f64>::zeros(4, 5);
        let mut solver = GenEigsSolver::new(&rect, EigsConfig::new(1, 3));
        assert!(matches!(
            solver.init(None).unwrap_err().kind(),
            EigsErrorKind::NotSquare { nrows: 4, ncols: 5 }
        ));

        let a: Mat<f64> = mat![
            [1.0, 2.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 2.0],
            [3.0, 0.0, 0.0, 0.0, 1.0],
        ];
        let mut solver = GenEigsSolver::new(&a, EigsConfig::new(1, 3));
        let zero = Col::<f64>::zeros(5);
        assert!(matches!(
            solver.init(Some(zero.as_ref())).unwrap_err().kind(),
            EigsErrorKind::ZeroInitialVector
        ));
        let short = Col::from_fn(4, |_| 1.0);
        assert!(solver.init(Some(short.as_ref())).unwrap_err().is_configuration_error());
        assert_eq!(solver.num_operations(), 0);
        assert_eq!(solver.state(), SolverState::Uninitialized);
    }

    #[test]
    fn test_compute_with_validates_its_arguments() {
        let a = bidiagonal(12);
        let mut solver = GenEigsSolver::new(&a, EigsConfig::new(2, 6));
        solver.init(None).unwrap();
        assert!(solver.compute_with(0, 1e-10).unwrap_err().is_configuration_error());
        assert!(solver.compute_with(10, -1.0).unwrap_err().is_configuration_error());
        assert_eq!(solver.compute_with(100, 1e-8).unwrap(), 2);
    }

    #[test]
    fn test_failed_restart_keeps_the_starting_vector() {
        let a = bidiagonal(20);
        let failing = Cell::new(false);
        let op = FnOperator::new(20, |x| {
            if failing.get() {
                anyhow::bail!("transient failure");
            }
            a.apply(x)
        });
        let v0 = Col::from_fn(20, |i| 1.0 + (i % 3) as f64);
        let mut solver = GenEigsSolver::new(&op, EigsConfig::new(2, 6));
        solver.init(Some(v0.as_ref())).unwrap();
        assert_eq!(solver.compute().unwrap(), 2);
        let first = solver.eigenvalues().unwrap().to_vec();

        failing.set(true);
        let err = solver.compute().unwrap_err();
        assert!(matches!(err.kind(), EigsErrorKind::Operator(_)));
        assert_eq!(solver.state(), SolverState::Uninitialized);
        let kept = solver.seed.as_ref().unwrap();
        for i in 0..20 {
            assert_eq!(kept[i], v0[i]);
        }

        failing.set(false);
        solver.init(Some(v0.as_ref())).unwrap();
        assert_eq!(solver.compute().unwrap(), 2);
        assert_eq!(solver.eigenvalues().unwrap(), first.as_slice());
    }
}
