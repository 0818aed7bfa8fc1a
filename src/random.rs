//! Deterministic random vectors for seeding and breakdown recovery.
//!
//! Randomness enters the Arnoldi process in exactly two places: the default starting
//! vector of [`crate::solvers::GenEigsSolver::init`], and the fresh directions drawn
//! when the Krylov basis breaks down. Both go through the [`RandomSource`] trait so
//! tests can substitute a source that forces (or defeats) the recovery path.
//!
//! Draws are addressed by a *stream* id rather than taken from one running generator.
//! The vector used to recover from a breakdown at column `j` is therefore the same
//! no matter how many draws happened before, which keeps repeated solves
//! bit-identical.

use faer::Col;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// A source of random vectors.
pub trait RandomSource {
    /// Returns a vector of length `n` for the given stream id.
    fn random_vector(&mut self, n: usize, stream: u64) -> Col<f64>;
}

/// The default source: uniform entries in `[-0.5, 0.5)` from a [`StdRng`] seeded by
/// combining a base seed with the stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededRandom {
    seed: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl RandomSource for SeededRandom {
    fn random_vector(&mut self, n: usize, stream: u64) -> Col<f64> {
        // Golden-ratio increment, so neighbouring streams get unrelated seeds.
        let mixed = self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = StdRng::seed_from_u64(mixed);
        Col::from_fn(n, |_| rng.random_range(-0.5..0.5))
    }
}

/// Stream id of the default starting vector.
pub(crate) const INITIAL_STREAM: u64 = 0;

/// Stream id of the `attempt`-th draw used to recover from a breakdown at column `col`.
pub(crate) fn restart_stream(col: usize, attempt: usize) -> u64 {
    1 + ((col as u64) << 8) + attempt as u64
}
