use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use crate::config::OptimizationConfig;
use crate::error::{TopOptError, TopOptResult};
use crate::fem::{Assembler, ElementFormulator, LoadCase};
use crate::linalg::SolverUtils;
use crate::mesh::{DensityGrid, HexMesh};
use super::filter::SensitivityFilter;
use super::oc::DensityUpdater;
use super::sensitivity::SensitivityAnalyzer;

/// Lifecycle of one optimization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    Iterating,
    /// Max density change dropped below `tol`
    Converged,
    /// `max_iter` iterations completed first
    MaxIterReached,
    /// Stopped by the caller's cancellation flag
    Cancelled,
    /// A fatal error aborted the run
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Initializing | RunState::Iterating)
    }
}

/// Read-only snapshot handed to the progress callback after each iteration
#[derive(Debug, Clone, Copy)]
pub struct IterationProgress<'a> {
    /// 1-based index of the completed iteration
    pub iteration: usize,
    pub density: &'a DensityGrid,
    /// Max absolute density change of this iteration
    pub change: f64,
    /// Compliance FᵀU of the design analysed in this iteration
    pub compliance: f64,
    pub volume_fraction: f64,
}

/// One row of the convergence history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub compliance: f64,
    pub change: f64,
    pub volume_fraction: f64,
}

/// Result of a run that did not fail
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// `Converged`, `MaxIterReached` or `Cancelled`
    pub state: RunState,
    /// Final density field, values in `[rho_min, 1]`
    pub density: DensityGrid,
    /// Completed iterations
    pub iterations: usize,
    /// Compliance of the last analysed design (`NaN` if none was analysed)
    pub compliance: f64,
    pub history: Vec<IterationRecord>,
}

/// SIMP compliance minimization driver
///
/// Each iteration assembles K for the current densities, solves for U,
/// computes filtered sensitivities and applies the Optimality Criteria
/// update. A driver holds only its configuration, so one driver (or many)
/// can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct OptimizationDriver {
    config: OptimizationConfig,
}

impl OptimizationDriver {
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Run to convergence or the iteration budget
    ///
    /// # Arguments
    /// * `mesh` - Voxel mesh from the voxelizer
    /// * `occupancy` - Initial occupancy (1 solid, 0 void), seeds the densities
    /// * `load_case` - Supports and point loads
    /// * `callback` - Invoked once per completed iteration
    ///
    /// # Errors
    /// Fatal errors from mesh validation, assembly or the linear solve abort
    /// the run and are returned unchanged.
    pub fn run<F>(
        &self,
        mesh: &HexMesh,
        occupancy: &DensityGrid,
        load_case: &LoadCase,
        callback: F,
    ) -> TopOptResult<OptimizationOutcome>
    where
        F: FnMut(&IterationProgress<'_>),
    {
        let never = AtomicBool::new(false);
        self.run_with_cancel(mesh, occupancy, load_case, &never, callback)
    }

    /// Like [`OptimizationDriver::run`], stopping early once `cancel` is set
    ///
    /// The flag is polled between iterations; a solve in progress finishes first.
    pub fn run_with_cancel<F>(
        &self,
        mesh: &HexMesh,
        occupancy: &DensityGrid,
        load_case: &LoadCase,
        cancel: &AtomicBool,
        callback: F,
    ) -> TopOptResult<OptimizationOutcome>
    where
        F: FnMut(&IterationProgress<'_>),
    {
        let start = Instant::now();
        let result = self.optimize(mesh, occupancy, load_case, cancel, callback);
        match &result {
            Ok(outcome) => info!(
                state = ?outcome.state,
                iterations = outcome.iterations,
                compliance = outcome.compliance,
                volume_fraction = outcome.density.volume_fraction(),
                seconds = start.elapsed().as_secs_f64(),
                "optimization finished"
            ),
            Err(e) => error!(state = ?RunState::Failed, error = %e, "optimization aborted"),
        }
        result
    }

    fn optimize<F>(
        &self,
        mesh: &HexMesh,
        occupancy: &DensityGrid,
        load_case: &LoadCase,
        cancel: &AtomicBool,
        mut callback: F,
    ) -> TopOptResult<OptimizationOutcome>
    where
        F: FnMut(&IterationProgress<'_>),
    {
        let cfg = &self.config;
        let mut state = RunState::Initializing;
        debug!(?state, elements = mesh.num_elements(), dofs = mesh.num_dofs());

        cfg.validate()?;
        if occupancy.shape() != mesh.shape() {
            return Err(TopOptError::invalid_mesh(format!(
                "occupancy grid {:?} does not match mesh grid {:?}",
                occupancy.shape(),
                mesh.shape()
            )));
        }
        if cfg.grid_shape() != mesh.shape() {
            // nelx/nely/nelz steer voxelization; the mesh grid is what gets optimized
            warn!(
                config = ?cfg.grid_shape(),
                mesh = ?mesh.shape(),
                "configured grid differs from the mesh grid, using the mesh"
            );
        }

        let ndof = mesh.num_dofs();
        let f = load_case.load_vector(ndof)?;
        let dof_mgr = load_case.dof_manager(ndof)?;

        let material = cfg.material()?;
        let ke = ElementFormulator::stiffness_for_box(&material.solid, &mesh.element_size());
        let filter = SensitivityFilter::new(mesh.shape(), cfg.rmin)?;
        let analyzer = SensitivityAnalyzer::new(ke, material.clone(), cfg.penal, filter, cfg.parallel);
        let updater = DensityUpdater::new(cfg.move_limit, cfg.rho_min);
        let solver = cfg.linear_solver();

        let mut density = occupancy.clone();
        density.clamp(cfg.rho_min, 1.0);

        let mut history = Vec::new();
        let mut compliance = f64::NAN;

        state = RunState::Iterating;
        debug!(?state, free_dofs = dof_mgr.num_free_dofs(), "design field seeded");

        let mut iteration = 0;
        while !state.is_terminal() {
            if cancel.load(Ordering::Relaxed) {
                state = RunState::Cancelled;
                break;
            }

            let k = Assembler::assemble(mesh, &density, &ke, &material, cfg.penal, cfg.parallel)?;
            let (u, _) = solver.solve_with(&k, &f, &dof_mgr)?;
            compliance = SolverUtils::dot(&f, &u);

            let dc = analyzer.compute(mesh, &density, &u);
            let updated = updater.update(&dc, &density, cfg.volfrac);
            let change = updated.max_abs_diff(&density);
            density = updated;
            iteration += 1;

            let volume_fraction = density.volume_fraction();
            history.push(IterationRecord {
                compliance,
                change,
                volume_fraction,
            });
            info!(iteration, compliance, change, volume_fraction, "iteration");

            callback(&IterationProgress {
                iteration,
                density: &density,
                change,
                compliance,
                volume_fraction,
            });

            if change < cfg.tol {
                state = RunState::Converged;
            } else if iteration >= cfg.max_iter {
                state = RunState::MaxIterReached;
            }
        }

        Ok(OptimizationOutcome {
            state,
            density,
            iterations: iteration,
            compliance,
            history,
        })
    }
}
