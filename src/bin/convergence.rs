//! Experiment Runner for the Convergence Study of the Selection Rules.
//!
//! For one generated test problem, this executable runs the Arnoldi solver once per
//! requested selection rule and records how much work each rule needed: outer
//! iterations, operator applications and restarts, together with the wall-clock time
//! and the largest true residual `‖A·v - λ·v‖_∞` of the returned eigenpairs.
//!
//! One CSV row is written per rule.

use anyhow::{Context, Result, anyhow};
use arnoldi_eigs::{
    EigsConfig, GenEigsSolver, LinearOperator, SelectionRule,
    utils::generators::{random_dense, random_sparse},
};
use clap::{Parser, ValueEnum};
use faer::{Col, MatRef, c64};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Instant};

/// Storage of the generated test matrix.
#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum MatrixKind {
    Dense,
    Sparse,
}

/// Command-line arguments for the convergence experiment.
#[derive(Parser, Debug)]
#[clap(
    name = "convergence-runner",
    about = "Compares the cost of the Arnoldi selection rules on a random general matrix."
)]
struct ConvergenceArgs {
    /// Storage of the generated matrix.
    #[clap(long, value_enum, default_value = "sparse")]
    kind: MatrixKind,
    /// Dimension of the generated matrix.
    #[clap(long, default_value_t = 1000)]
    n: usize,
    /// Number of wanted eigenvalues.
    #[clap(long, default_value_t = 20)]
    nev: usize,
    /// Dimension of the Krylov subspace.
    #[clap(long, default_value_t = 50)]
    ncv: usize,
    /// Fill ratio of the sparse matrix.
    #[clap(long, default_value_t = 0.5)]
    density: f64,
    /// Seed of both the matrix generator and the solver.
    #[clap(long, default_value_t = 0)]
    seed: u64,
    /// Comma-separated list of selection rules to run.
    #[clap(long, value_delimiter = ',', default_value = "LM,LR,LI,SM,SR,SI")]
    rules: Vec<SelectionRule>,
    /// Path to the output CSV file.
    #[clap(long)]
    output: PathBuf,
}

/// Represents a single row in the output CSV file.
#[derive(Debug, Serialize, Deserialize)]
struct ConvergenceResult {
    rule: SelectionRule,
    kind: MatrixKind,
    n: usize,
    nev: usize,
    ncv: usize,
    converged: usize,
    info: String,
    iterations: usize,
    operations: usize,
    restarts: usize,
    time_s: f64,
    max_residual: f64,
}

/// Largest entry of `A·V - V·Λ`, evaluating `A·v` as `A·Re(v) + i·A·Im(v)`.
fn max_residual(op: &dyn LinearOperator, values: &[c64], vectors: MatRef<'_, c64>) -> Result<f64> {
    let n = vectors.nrows();
    let mut err = 0.0f64;
    for (j, &lambda) in values.iter().enumerate() {
        let a_re = op.apply(Col::from_fn(n, |i| vectors[(i, j)].re).as_ref())?;
        let a_im = op.apply(Col::from_fn(n, |i| vectors[(i, j)].im).as_ref())?;
        for i in 0..n {
            let residual = c64::new(a_re[i], a_im[i]) - lambda * vectors[(i, j)];
            err = err.max(residual.norm());
        }
    }
    Ok(err)
}

/// Solves with one rule. Rules without any converged pair get a `NaN` residual.
fn run_rule(
    op: &dyn LinearOperator,
    args: &ConvergenceArgs,
    rule: SelectionRule,
) -> Result<ConvergenceResult> {
    let config = EigsConfig::new(args.nev, args.ncv)
        .with_rule(rule)
        .with_seed(args.seed);
    let mut solver = GenEigsSolver::new(op, config);

    let start = Instant::now();
    solver.init(None)?;
    let converged = solver.compute()?;
    let time_s = start.elapsed().as_secs_f64();

    let max_residual = if converged > 0 {
        max_residual(op, solver.eigenvalues()?, solver.eigenvectors()?)?
    } else {
        f64::NAN
    };
    log::info!(
        "{rule}: {:?} with {converged}/{} eigenpairs in {} iterations ({time_s:.3} s).",
        solver.info(),
        args.nev,
        solver.num_iterations()
    );

    Ok(ConvergenceResult {
        rule,
        kind: args.kind,
        n: args.n,
        nev: args.nev,
        ncv: args.ncv,
        converged,
        info: format!("{:?}", solver.info()),
        iterations: solver.num_iterations(),
        operations: solver.num_operations(),
        restarts: solver.num_restarts(),
        time_s,
        max_residual,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    let args = ConvergenceArgs::parse();
    log::info!(
        "Generating a {:?} {n}x{n} test matrix (seed {}).",
        args.kind,
        args.seed,
        n = args.n
    );

    let dense;
    let sparse;
    let op: &dyn LinearOperator = match args.kind {
        MatrixKind::Dense => {
            dense = random_dense(args.n, args.seed);
            &dense
        }
        MatrixKind::Sparse => {
            sparse = random_sparse(args.n, args.density, args.seed)
                .context("Failed to generate the sparse test matrix")?;
            &sparse
        }
    };

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("Failed to create output file: {:?}", args.output))?;
    for &rule in &args.rules {
        let result = run_rule(op, &args, rule)
            .with_context(|| format!("Solver failed for rule {rule}"))?;
        writer.serialize(result)?;
    }
    writer.flush()?;

    log::info!("Results saved to {:?}", args.output);
    Ok(())
}
