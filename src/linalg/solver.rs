use sprs::CsMat;
use thiserror::Error;

/// Statistics from solver execution
#[derive(Debug, Clone)]
pub struct SolverStats {
    /// Number of iterations (0 for direct solvers)
    pub iterations: usize,

    /// Final residual norm ||r|| = ||b - Ax||
    pub residual_norm: f64,

    /// Relative residual ||r|| / ||b||
    pub relative_residual: f64,

    /// Whether solver converged
    pub converged: bool,

    /// Solve time in seconds
    pub solve_time: f64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            iterations: 0,
            residual_norm: 0.0,
            relative_residual: 0.0,
            converged: false,
            solve_time: 0.0,
        }
    }
}

impl Default for SolverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a raw linear solve gave up
///
/// Carries no DOF partition context; [`crate::linalg::LinearSolver`] adds it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    /// Zero or negative pivot / curvature: the matrix is not positive definite
    #[error("{0}")]
    Singular(String),

    /// Iteration budget exhausted before reaching the tolerance
    #[error("{0}")]
    NotConverged(String),
}

/// Trait for a linear operator A that can be applied to a vector x to get Ax
pub trait LinearOperator {
    /// Apply the operator to vector v: out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    /// Number of rows (output dimension)
    fn rows(&self) -> usize;

    /// Number of columns (input dimension)
    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let n = self.rows();
        let mut result = vec![0.0; n];
        if self.is_csr() {
            for (row_idx, row) in self.outer_iterator().enumerate() {
                let mut sum = 0.0;
                for (col_idx, &val) in row.iter() {
                    sum += val * v[col_idx];
                }
                result[row_idx] = sum;
            }
        } else {
            for (col_idx, col) in self.outer_iterator().enumerate() {
                for (row_idx, &val) in col.iter() {
                    result[row_idx] += val * v[col_idx];
                }
            }
        }
        result
    }

    fn rows(&self) -> usize {
        self.rows()
    }

    fn cols(&self) -> usize {
        self.cols()
    }
}

/// Linear system solver trait
///
/// Solves Ax = b for x with A symmetric positive definite
pub trait Solver {
    /// Solve the linear system Ax = b
    ///
    /// # Arguments
    /// * `A` - System matrix (n x n)
    /// * `b` - Right-hand side vector (n)
    ///
    /// # Returns
    /// * Solution vector x (n)
    /// * Solver statistics
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats), SolveFailure>;

    /// Get solver name
    fn name(&self) -> &str;
}

/// Helper functions for solver validation
pub struct SolverUtils;

impl SolverUtils {
    /// Compute residual r = b - Ax
    #[allow(non_snake_case)]
    pub fn compute_residual<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> Vec<f64> {
        let ax = A.apply(x);
        b.iter()
            .zip(ax.iter())
            .map(|(&bi, &axi)| bi - axi)
            .collect()
    }

    /// Compute L2 norm of a vector
    pub fn norm(v: &[f64]) -> f64 {
        v.iter().map(|&x| x * x).sum::<f64>().sqrt()
    }

    /// Dot product of two vectors
    pub fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
    }

    /// Compute residual norm ||b - Ax||
    #[allow(non_snake_case)]
    pub fn residual_norm<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> f64 {
        let r = Self::compute_residual(A, x, b);
        Self::norm(&r)
    }

    /// Compute relative residual ||b - Ax|| / ||b||
    #[allow(non_snake_case)]
    pub fn relative_residual<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> f64 {
        let r_norm = Self::residual_norm(A, x, b);
        let b_norm = Self::norm(b);

        if b_norm < 1e-14 {
            r_norm
        } else {
            r_norm / b_norm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    #[test]
    fn test_norm() {
        let v = vec![3.0, 4.0];
        let norm = SolverUtils::norm(&v);
        assert_relative_eq!(norm, 5.0, epsilon = 1e-14);
        assert_relative_eq!(SolverUtils::dot(&v, &v), 25.0, epsilon = 1e-14);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_residual() {
        // Simple 2x2 system: [2 1; 1 2] x = [3; 3]
        // Solution: x = [1; 1]
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 2.0);
        let A = triplets.to_csr();

        let x = vec![1.0, 1.0];
        let b = vec![3.0, 3.0];

        let r_norm = SolverUtils::residual_norm(&A, &x, &b);
        assert_relative_eq!(r_norm, 0.0, epsilon = 1e-14);

        // Same operator stored column-major
        let A_csc: CsMat<f64> = A.to_csc();
        assert_relative_eq!(SolverUtils::residual_norm(&A_csc, &x, &b), 0.0, epsilon = 1e-14);
    }
}
