use sprs::{CsMat, FillInReduction, SymmetryCheck};
use sprs_ldl::Ldl;
use std::time::Instant;
use super::solver::{SolveFailure, Solver, SolverStats, SolverUtils};

/// Pivots below this fraction of the largest pivot count as zero
const PIVOT_TOL: f64 = 1e-14;

/// Relative residual above which a factorization is rejected as unusable
const RESIDUAL_LIMIT: f64 = 1e-6;

/// Direct sparse solver using an LDLᵀ factorization
///
/// Uses `sprs-ldl` with reverse Cuthill–McKee fill-in reduction.
/// Requires a symmetric positive definite matrix: every pivot of D must be
/// strictly positive. Good for small to medium problems (<100k DOF).
pub struct DirectSolver {
    /// Solver name
    name: String,
}

impl DirectSolver {
    pub fn new() -> Self {
        Self {
            name: "Direct (Sparse LDLᵀ)".to_string(),
        }
    }
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DirectSolver {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats), SolveFailure> {
        let start = Instant::now();

        let ldl = Ldl::new()
            .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(A.view())
            .map_err(|e| SolveFailure::Singular(format!("LDLᵀ factorization failed: {}", e)))?;

        let d_max = ldl.d().iter().fold(0.0_f64, |m, &d| m.max(d.abs()));
        if let Some((i, &d)) = ldl
            .d()
            .iter()
            .enumerate()
            .find(|(_, &d)| !(d > PIVOT_TOL * d_max))
        {
            return Err(SolveFailure::Singular(format!(
                "pivot {} of the LDLᵀ factorization is {:e} (largest {:e})",
                i, d, d_max
            )));
        }

        let x = ldl.solve(b);

        let solve_time = start.elapsed().as_secs_f64();

        let residual_norm = SolverUtils::residual_norm(A, &x, b);
        let relative_residual = SolverUtils::relative_residual(A, &x, b);
        if !(relative_residual <= RESIDUAL_LIMIT) {
            return Err(SolveFailure::Singular(format!(
                "factorization is numerically singular (relative residual {:e})",
                relative_residual
            )));
        }

        let stats = SolverStats {
            iterations: 0, // Direct solver doesn't iterate
            residual_norm,
            relative_residual,
            converged: true,
            solve_time,
        };

        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    #[test]
    fn test_direct_solver_simple() {
        // Solve [2 1; 1 2] x = [3; 3]
        // Solution: x = [1; 1]
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 2.0);
        let a = triplets.to_csr();

        let b = vec![3.0, 3.0];

        let mut solver = DirectSolver::new();
        let (x, stats) = solver.solve(&a, &b).unwrap();

        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
        assert!(stats.converged);
        assert!(stats.relative_residual < 1e-12);
    }

    #[test]
    fn test_direct_solver_diagonal() {
        let mut triplets = TriMat::new((3, 3));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(1, 1, 4.0);
        triplets.add_triplet(2, 2, 8.0);
        let a = triplets.to_csr();

        let mut solver = DirectSolver::new();
        let (x, _) = solver.solve(&a, &[2.0, 4.0, 8.0]).unwrap();
        for xi in x {
            assert_relative_eq!(xi, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_direct_solver_rejects_singular() {
        // [1 1; 1 1] has a zero pivot after elimination
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 1.0);
        let a = triplets.to_csr();

        let mut solver = DirectSolver::new();
        assert!(matches!(solver.solve(&a, &[1.0, 1.0]), Err(SolveFailure::Singular(_))));
    }

    #[test]
    fn test_direct_solver_rejects_indefinite() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(1, 1, -3.0);
        let a = triplets.to_csr();

        let mut solver = DirectSolver::new();
        assert!(matches!(solver.solve(&a, &[1.0, 1.0]), Err(SolveFailure::Singular(_))));
    }
}
