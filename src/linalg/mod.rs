//! Linear algebra utilities
//!
//! Sparse weighted linear least squares, the numeric backbone of both the
//! chordal rotation relaxation and the translation recovery: rows are
//! accumulated as triplets, the weighted normal equations are formed and
//! solved with faer's sparse Cholesky factorization.

use std::ops::Mul;

use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::{SparseColMat, Triplet};
use faer::Mat;

use crate::error::{InitError, InitResult};

/// Row-by-row assembler for a sparse weighted least-squares problem
/// `min ‖√W (A·x − b)‖²`.
///
/// Weights are applied at assembly time (each row is scaled by the square
/// root of its weight), so the solve reduces to plain normal equations.
pub struct WeightedLeastSquares {
    ncols: usize,
    triplets: Vec<Triplet<usize, usize, f64>>,
    rhs: Vec<f64>,
}

impl WeightedLeastSquares {
    /// Create an empty problem over `ncols` unknowns.
    pub fn new(ncols: usize) -> Self {
        Self {
            ncols,
            triplets: Vec::new(),
            rhs: Vec::new(),
        }
    }

    /// Number of rows accumulated so far.
    pub fn nrows(&self) -> usize {
        self.rhs.len()
    }

    /// Append one residual row from its non-zero entries, right-hand side
    /// and weight.
    pub fn add_row(&mut self, entries: &[(usize, f64)], rhs: f64, weight: f64) {
        let scale = weight.sqrt();
        let row = self.rhs.len();
        for &(col, value) in entries {
            if value != 0.0 {
                self.triplets.push(Triplet::new(row, col, value * scale));
            }
        }
        self.rhs.push(rhs * scale);
    }

    /// Solve the accumulated problem via the normal equations
    /// `AᵀA·x = Aᵀb` and a sparse Cholesky factorization.
    pub fn solve(&self) -> InitResult<Vec<f64>> {
        let nrows = self.rhs.len();
        if nrows == 0 || self.ncols == 0 {
            return Err(InitError::LinearAlgebra(
                "empty least-squares problem".to_string(),
            ));
        }

        let a = SparseColMat::<usize, f64>::try_new_from_triplets(nrows, self.ncols, &self.triplets)
            .map_err(|e| InitError::LinearAlgebra(format!("failed to create sparse matrix: {e:?}")))?;
        let b = Mat::<f64>::from_fn(nrows, 1, |i, _| self.rhs[i]);

        let a_t = a
            .as_ref()
            .transpose()
            .to_col_major()
            .map_err(|e| InitError::LinearAlgebra(format!("transpose failed: {e:?}")))?;
        let hessian = a_t.as_ref().mul(a.as_ref());
        let gradient = a_t.as_ref().mul(b.as_ref());

        let symbolic = SymbolicLlt::try_new(hessian.symbolic(), faer::Side::Lower)
            .map_err(|e| InitError::LinearAlgebra(format!("symbolic factorization failed: {e:?}")))?;
        let cholesky = Llt::try_new_with_symbolic(symbolic, hessian.as_ref(), faer::Side::Lower)
            .map_err(|e| {
                InitError::LinearAlgebra(format!("normal matrix is not positive definite: {e:?}"))
            })?;

        let x = cholesky.solve(gradient);
        Ok((0..self.ncols).map(|i| x[(i, 0)]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_determined_system() {
        // x0 = 2, x0 + x1 = 5
        let mut problem = WeightedLeastSquares::new(2);
        problem.add_row(&[(0, 1.0)], 2.0, 1.0);
        problem.add_row(&[(0, 1.0), (1, 1.0)], 5.0, 1.0);
        let x = problem.solve().unwrap();
        assert!((x[0] - 2.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_overdetermined_weighted_mean() {
        // Two conflicting measurements of one unknown; the heavier weight wins
        let mut problem = WeightedLeastSquares::new(1);
        problem.add_row(&[(0, 1.0)], 1.0, 1.0);
        problem.add_row(&[(0, 1.0)], 4.0, 3.0);
        let x = problem.solve().unwrap();
        assert!((x[0] - 3.25).abs() < 1e-9);
    }

    #[test]
    fn test_underdetermined_reports_error() {
        // Unknown 1 is never referenced, so the normal matrix is singular
        let mut problem = WeightedLeastSquares::new(2);
        problem.add_row(&[(0, 1.0)], 1.0, 1.0);
        assert!(problem.solve().is_err());
    }

    #[test]
    fn test_empty_problem_reports_error() {
        let problem = WeightedLeastSquares::new(3);
        assert!(problem.solve().is_err());
    }
}
