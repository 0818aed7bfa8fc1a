//! Seeded generators for the test problems used by the integration tests and the
//! experiment runner.
//!
//! All generators are deterministic: the same arguments always produce the same
//! matrix, so experiments can be repeated exactly.

use faer::{
    Mat,
    sparse::{SparseColMat, Triplet},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

/// Represents all possible errors that can occur while generating a test problem.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The requested fill ratio is outside `(0, 1]`.
    #[error("Invalid density {0}: expected a value in (0, 1].")]
    InvalidDensity(f64),
    /// Occurs if the sparse matrix construction fails internally.
    #[error("Internal error: Failed to construct the sparse matrix from triplets.")]
    SparseMatrixConstruction,
}

/// A dense `n × n` matrix with independent entries uniform in `[-1, 1)`.
pub fn random_dense(n: usize, seed: u64) -> Mat<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Mat::from_fn(n, n, |_, _| rng.random_range(-1.0..1.0))
}

/// The non-zero pattern of a random sparse `n × n` matrix.
///
/// Entries are visited row by row. Each is kept when a uniform draw from `[0, 1)`
/// falls below `density`, and then gets a value uniform in `[-1, 1)`.
pub fn random_sparse_triplets(
    n: usize,
    density: f64,
    seed: u64,
) -> Result<Vec<Triplet<usize, usize, f64>>, GeneratorError> {
    if !(density > 0.0 && density <= 1.0) {
        return Err(GeneratorError::InvalidDensity(density));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut triplets = Vec::with_capacity((density * (n * n) as f64) as usize + n);
    for row in 0..n {
        for col in 0..n {
            if rng.random::<f64>() < density {
                let val = rng.random_range(-1.0..1.0);
                triplets.push(Triplet { row, col, val });
            }
        }
    }
    Ok(triplets)
}

/// A random sparse `n × n` matrix in compressed sparse column format; see
/// [`random_sparse_triplets`].
pub fn random_sparse(
    n: usize,
    density: f64,
    seed: u64,
) -> Result<SparseColMat<usize, f64>, GeneratorError> {
    let triplets = random_sparse_triplets(n, density, seed)?;
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|_| GeneratorError::SparseMatrixConstruction)
}

/// Assembles the dense counterpart of a triplet list. Duplicate entries are summed,
/// as in the sparse constructor.
pub fn dense_from_triplets(n: usize, triplets: &[Triplet<usize, usize, f64>]) -> Mat<f64> {
    let mut a = Mat::zeros(n, n);
    for t in triplets {
        a[(t.row, t.col)] += t.val;
    }
    a
}

/// A sparse diagonal matrix with the given diagonal.
pub fn diagonal_sparse(diagonal: &[f64]) -> Result<SparseColMat<usize, f64>, GeneratorError> {
    let n = diagonal.len();
    let triplets: Vec<_> = diagonal
        .iter()
        .enumerate()
        .map(|(i, &val)| Triplet { row: i, col: i, val })
        .collect();
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|_| GeneratorError::SparseMatrixConstruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LinearOperator;
    use faer::Col;

    #[test]
    fn test_generators_are_deterministic() {
        let a = random_dense(8, 42);
        let b = random_dense(8, 42);
        let c = random_dense(8, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let t1 = random_sparse_triplets(30, 0.2, 7).unwrap();
        let t2 = random_sparse_triplets(30, 0.2, 7).unwrap();
        assert_eq!(t1.len(), t2.len());
        assert!(
            t1.iter()
                .zip(&t2)
                .all(|(x, y)| (x.row, x.col, x.val) == (y.row, y.col, y.val))
        );
    }

    #[test]
    fn test_sparse_density_is_respected() {
        let triplets = random_sparse_triplets(100, 0.1, 1).unwrap();
        let fill = triplets.len() as f64 / 10_000.0;
        assert!((fill - 0.1).abs() < 0.02, "fill ratio {fill}");
        assert!(triplets.iter().all(|t| (-1.0..1.0).contains(&t.val)));
        assert_eq!(random_sparse_triplets(100, 1.0, 1).unwrap().len(), 10_000);
    }

    #[test]
    fn test_invalid_density_is_an_error() {
        for density in [0.0, -0.5, 1.5, f64::NAN] {
            let err = random_sparse(10, density, 0).unwrap_err();
            assert!(matches!(err, GeneratorError::InvalidDensity(_)));
        }
        assert_eq!(
            GeneratorError::InvalidDensity(2.0).to_string(),
            "Invalid density 2: expected a value in (0, 1]."
        );
    }

    #[test]
    fn test_dense_and_sparse_agree() {
        let triplets = random_sparse_triplets(12, 0.5, 3).unwrap();
        let dense = dense_from_triplets(12, &triplets);
        let sparse = random_sparse(12, 0.5, 3).unwrap();
        let x = Col::from_fn(12, |i| (i as f64 - 5.5) / 3.0);

        let operators: [&dyn LinearOperator; 2] = [&dense, &sparse];
        let y_dense = operators[0].apply(x.as_ref()).unwrap();
        let y_sparse = operators[1].apply(x.as_ref()).unwrap();
        for i in 0..12 {
            assert!((y_dense[i] - y_sparse[i]).abs() < 1e-13);
        }
        assert_eq!(dense[(triplets[0].row, triplets[0].col)], triplets[0].val);
    }
}
