use sprs::CsMat;
use std::time::Instant;
use super::solver::{LinearOperator, SolveFailure, Solver, SolverStats, SolverUtils};
use super::preconditioner::{IdentityPreconditioner, JacobiPreconditioner, Preconditioner};

/// Residual norm accepted regardless of the right-hand side
const ABS_TOLERANCE: f64 = 1e-30;

/// Conjugate Gradient solver for symmetric positive definite systems
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
    use_preconditioner: bool,
    name: String,
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            use_preconditioner: true,
            name: "ConjugateGradient".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_preconditioner(mut self, use_precond: bool) -> Self {
        self.use_preconditioner = use_precond;
        self
    }

    /// Preconditioned CG on any linear operator
    ///
    /// A non-positive curvature `pᵀAp <= 0` means A is not positive definite
    /// on the current Krylov space and is reported as singular.
    pub fn solve_with_operator<O, P>(
        &self,
        a: &O,
        b: &[f64],
        precond: &P,
    ) -> Result<(Vec<f64>, SolverStats), SolveFailure>
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm == 0.0 {
            return Ok((vec![0.0; n], SolverStats {
                iterations: 0,
                residual_norm: 0.0,
                relative_residual: 0.0,
                converged: true,
                solve_time: start.elapsed().as_secs_f64(),
            }));
        }

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();

        let mut z = precond.apply(&r);
        let mut p = z.clone();
        let mut rz = SolverUtils::dot(&r, &z);

        let mut iteration = 0;
        let mut final_res = b_norm;

        while iteration < self.max_iterations {
            let ap = a.apply(&p);
            let p_ap = SolverUtils::dot(&p, &ap);

            if !(p_ap > 0.0) {
                return Err(SolveFailure::Singular(format!(
                    "non-positive curvature pᵀAp = {:e} at CG iteration {}",
                    p_ap, iteration
                )));
            }
            let alpha = rz / p_ap;

            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            iteration += 1;

            final_res = SolverUtils::norm(&r);
            if final_res < self.tolerance * b_norm || final_res < ABS_TOLERANCE {
                return Ok((x, SolverStats {
                    iterations: iteration,
                    residual_norm: final_res,
                    relative_residual: final_res / b_norm,
                    converged: true,
                    solve_time: start.elapsed().as_secs_f64(),
                }));
            }

            z = precond.apply(&r);
            let rz_new = SolverUtils::dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        Err(SolveFailure::NotConverged(format!(
            "CG stopped after {} iterations with relative residual {:e}",
            iteration,
            final_res / b_norm
        )))
    }
}

impl Solver for ConjugateGradient {
    fn solve(&mut self, a: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats), SolveFailure> {
        if self.use_preconditioner {
            let precond = JacobiPreconditioner::new(a);
            self.solve_with_operator(a, b, &precond)
        } else {
            let precond = IdentityPreconditioner;
            self.solve_with_operator(a, b, &precond)
        }
    }

    fn name(&self) -> &str { &self.name }
}

impl Default for ConjugateGradient { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    fn laplacian_1d(n: usize) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, 2.0);
            if i > 0 {
                tri.add_triplet(i, i - 1, -1.0);
            }
            if i + 1 < n {
                tri.add_triplet(i, i + 1, -1.0);
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_cg_basic() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 2.0);
        let a = triplets.to_csr();
        let b = vec![3.0, 3.0];
        let mut solver = ConjugateGradient::new();
        let (x, stats) = solver.solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-8);
        assert!(stats.converged);
    }

    #[test]
    fn test_cg_laplacian_converges_in_n_steps() {
        let a = laplacian_1d(20);
        let b = vec![1.0; 20];
        let mut solver = ConjugateGradient::new().with_preconditioner(false);
        let (x, stats) = solver.solve(&a, &b).unwrap();
        assert!(stats.iterations <= 20);
        assert!(SolverUtils::relative_residual(&a, &x, &b) < 1e-8);
    }

    #[test]
    fn test_cg_zero_rhs() {
        let a = laplacian_1d(4);
        let mut solver = ConjugateGradient::new();
        let (x, stats) = solver.solve(&a, &[0.0; 4]).unwrap();
        assert_eq!(x, vec![0.0; 4]);
        assert_eq!(stats.iterations, 0);
    }

    #[test]
    fn test_cg_indefinite_is_singular() {
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(1, 1, -1.0);
        let a = tri.to_csr();
        let mut solver = ConjugateGradient::new().with_preconditioner(false);
        assert!(matches!(solver.solve(&a, &[0.0, 1.0]), Err(SolveFailure::Singular(_))));
    }

    #[test]
    fn test_cg_iteration_cap() {
        let a = laplacian_1d(50);
        let b = vec![1.0; 50];
        let mut solver = ConjugateGradient::new().with_max_iterations(2);
        assert!(matches!(solver.solve(&a, &b), Err(SolveFailure::NotConverged(_))));
    }
}
