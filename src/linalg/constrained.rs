use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use tracing::debug;
use crate::error::{TopOptError, TopOptResult};
use crate::fem::DofManager;
use super::direct::DirectSolver;
use super::iterative::ConjugateGradient;
use super::solver::{SolveFailure, Solver, SolverStats};

/// Largest reduced system `Auto` hands to the direct solver
pub const AUTO_DIRECT_LIMIT: usize = 60_000;

/// Fixed DOFs needed to suppress the six rigid body modes of a 3D solid
pub const MIN_FIXED_DOFS: usize = 6;

/// Relative residual target of the CG strategy
const CG_TOLERANCE: f64 = 1e-10;

/// Which linear solver handles the reduced system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStrategy {
    /// Direct below [`AUTO_DIRECT_LIMIT`] free DOFs, CG above
    #[default]
    Auto,
    /// Sparse LDLᵀ factorization
    Direct,
    /// Jacobi-preconditioned conjugate gradient
    ConjugateGradient,
}

/// Solves K U = F with prescribed displacements
///
/// Partitions the DOFs into fixed and free, solves
/// `K_ff U_f = F_f − K_fc U_c` and reinserts the prescribed values. The
/// reduced system is solved serially, so equal inputs give bitwise equal
/// displacements.
#[derive(Debug, Clone)]
pub struct LinearSolver {
    strategy: SolverStrategy,
}

impl LinearSolver {
    pub fn new(strategy: SolverStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SolverStrategy {
        self.strategy
    }

    /// Solve with the listed DOFs held at zero displacement
    ///
    /// # Errors
    /// * `SingularSystem` when `fixed` is empty or the reduced matrix is singular
    /// * `NumericalFailure` when the displacements are not finite
    pub fn solve(&self, k: &CsMat<f64>, f: &[f64], fixed: &[usize]) -> TopOptResult<Vec<f64>> {
        let dof_mgr = DofManager::with_fixed(f.len(), fixed)?;
        self.solve_with(k, f, &dof_mgr).map(|(u, _)| u)
    }

    /// Solve with the supports and prescribed values held by `dof_mgr`
    pub fn solve_with(
        &self,
        k: &CsMat<f64>,
        f: &[f64],
        dof_mgr: &DofManager,
    ) -> TopOptResult<(Vec<f64>, SolverStats)> {
        let n = dof_mgr.total_dofs();
        if k.rows() != n || k.cols() != n || f.len() != n {
            return Err(TopOptError::assembly(format!(
                "system shape mismatch: K is {}x{}, F has {} entries, {} DOFs",
                k.rows(),
                k.cols(),
                f.len(),
                n
            )));
        }
        if let Some(i) = f.iter().position(|v| !v.is_finite()) {
            return Err(TopOptError::numerical(format!("load vector entry {} is {}", i, f[i])));
        }

        let n_free = dof_mgr.num_free_dofs();
        let n_fixed = dof_mgr.num_constrained_dofs();
        if n_fixed == 0 {
            return Err(TopOptError::singular(
                n_free,
                n_fixed,
                "no fixed DOFs, rigid body motion is unconstrained",
            ));
        }
        if n_fixed < MIN_FIXED_DOFS && n_free > 0 {
            return Err(TopOptError::singular(
                n_free,
                n_fixed,
                format!(
                    "only {} fixed DOFs, at least {} are needed to remove rigid body modes",
                    n_fixed, MIN_FIXED_DOFS
                ),
            ));
        }

        let free = dof_mgr.free_dofs();
        let mut u: Vec<f64> = (0..n).map(|d| dof_mgr.get_dirichlet_value(d)).collect();
        if n_free == 0 {
            return Ok((u, SolverStats { converged: true, ..SolverStats::new() }));
        }

        let (k_ff, f_f) = Self::reduce(k, f, dof_mgr)?;
        Self::check_reduced(&k_ff, &free, n_fixed)?;

        let (x, stats, name) = self.dispatch(&k_ff, &f_f).map_err(|failure| match failure {
            SolveFailure::Singular(reason) => TopOptError::singular(n_free, n_fixed, reason),
            SolveFailure::NotConverged(reason) => TopOptError::numerical(reason),
        })?;

        if let Some(r) = x.iter().position(|v| !v.is_finite()) {
            return Err(TopOptError::numerical(format!(
                "displacement of DOF {} is {}",
                free[r], x[r]
            )));
        }

        debug!(
            solver = name,
            free = n_free,
            fixed = n_fixed,
            iterations = stats.iterations,
            relative_residual = stats.relative_residual,
            seconds = stats.solve_time,
            "reduced system solved"
        );

        for (r, &d) in free.iter().enumerate() {
            u[d] = x[r];
        }
        Ok((u, stats))
    }

    /// Free-free block of K and the right-hand side with the prescribed
    /// displacements moved over: `F_f − K_fc U_c`
    fn reduce(
        k: &CsMat<f64>,
        f: &[f64],
        dof_mgr: &DofManager,
    ) -> TopOptResult<(CsMat<f64>, Vec<f64>)> {
        let map = dof_mgr.reduced_index_map();
        let n_free = dof_mgr.num_free_dofs();

        let mut f_f = vec![0.0; n_free];
        for (d, slot) in map.iter().enumerate() {
            if let Some(r) = *slot {
                f_f[r] = f[d];
            }
        }

        let mut tri = TriMat::new((n_free, n_free));
        for (&val, (row, col)) in k.iter() {
            if !val.is_finite() {
                return Err(TopOptError::numerical(format!(
                    "stiffness entry ({}, {}) is {}",
                    row, col, val
                )));
            }
            match (map[row], map[col]) {
                (Some(r), Some(c)) => tri.add_triplet(r, c, val),
                (Some(r), None) => f_f[r] -= val * dof_mgr.get_dirichlet_value(col),
                _ => {}
            }
        }

        Ok((tri.to_csr(), f_f))
    }

    /// Reject reduced matrices that are obviously singular before factorizing
    fn check_reduced(k_ff: &CsMat<f64>, free: &[usize], n_fixed: usize) -> TopOptResult<()> {
        let n_free = free.len();
        let frobenius = k_ff.data().iter().map(|v| v * v).sum::<f64>().sqrt();
        if frobenius == 0.0 {
            return Err(TopOptError::singular(
                n_free,
                n_fixed,
                "reduced stiffness matrix has zero norm",
            ));
        }

        for (r, &d) in free.iter().enumerate() {
            let diag = k_ff.get(r, r).copied().unwrap_or(0.0);
            if !(diag > 0.0) {
                return Err(TopOptError::singular(
                    n_free,
                    n_fixed,
                    format!("diagonal of free DOF {} is {:e}", d, diag),
                ));
            }
        }
        Ok(())
    }

    fn dispatch(
        &self,
        k_ff: &CsMat<f64>,
        f_f: &[f64],
    ) -> Result<(Vec<f64>, SolverStats, &'static str), SolveFailure> {
        let n_free = f_f.len();
        let strategy = match self.strategy {
            SolverStrategy::Auto if n_free <= AUTO_DIRECT_LIMIT => SolverStrategy::Direct,
            SolverStrategy::Auto => SolverStrategy::ConjugateGradient,
            other => other,
        };

        match strategy {
            SolverStrategy::Direct => {
                let (x, stats) = DirectSolver::new().solve(k_ff, f_f)?;
                Ok((x, stats, "direct"))
            }
            _ => {
                let mut cg = ConjugateGradient::new()
                    .with_tolerance(CG_TOLERANCE)
                    .with_max_iterations((10 * n_free).max(1000));
                let (x, stats) = cg.solve(k_ff, f_f)?;
                Ok((x, stats, "conjugate_gradient"))
            }
        }
    }
}

impl Default for LinearSolver {
    fn default() -> Self {
        Self::new(SolverStrategy::Auto)
    }
}
