use tracing::{debug, warn};
use crate::error::{TopOptError, TopOptResult};
use crate::mesh::DensityGrid;

/// Upper end of the Lagrange multiplier bracket
const LAMBDA_MAX: f64 = 1e9;

/// Bisection stops once the bracket is narrower than this (relative below λ = 0.5)
const BISECTION_TOL: f64 = 1e-4;

/// Hard cap on bisection steps
const MAX_BISECTIONS: usize = 200;

/// Optimality Criteria density update
///
/// For a trial multiplier λ each element moves to
/// `clamp(ρ_e √(max(0, −dc_e / λ)), ρ_e − move, ρ_e + move)` clamped to
/// `[ρ_min, 1]`. λ is bisected on `[0, 1e9]` until the candidate volume meets
/// `volfrac · N`. The candidate volume is non-increasing in λ.
#[derive(Debug, Clone)]
pub struct DensityUpdater {
    move_limit: f64,
    rho_min: f64,
}

impl DensityUpdater {
    pub fn new(move_limit: f64, rho_min: f64) -> Self {
        Self { move_limit, rho_min }
    }

    /// Updated density field
    ///
    /// Never fails: an internal error returns the input unchanged and logs a
    /// warning.
    pub fn update(&self, dc: &[f64], density: &DensityGrid, volfrac: f64) -> DensityGrid {
        match self.try_update(dc, density, volfrac) {
            Ok(updated) => updated,
            Err(e) => {
                warn!(error = %e, "density update failed, keeping the current field");
                density.clone()
            }
        }
    }

    /// Updated density field, reporting internal errors
    pub fn try_update(&self, dc: &[f64], density: &DensityGrid, volfrac: f64) -> TopOptResult<DensityGrid> {
        let rho = density.as_slice();
        if dc.len() != rho.len() {
            return Err(TopOptError::numerical(format!(
                "{} sensitivities for {} cells",
                dc.len(),
                rho.len()
            )));
        }
        if let Some(e) = dc.iter().position(|v| !v.is_finite()) {
            return Err(TopOptError::numerical(format!("sensitivity of cell {} is {}", e, dc[e])));
        }
        if let Some(e) = rho.iter().position(|v| !v.is_finite()) {
            return Err(TopOptError::numerical(format!("density of cell {} is {}", e, rho[e])));
        }

        let target = volfrac * rho.len() as f64;
        let mut candidate = rho.to_vec();
        let (mut l1, mut l2) = (0.0_f64, LAMBDA_MAX);
        let mut steps = 0;

        while l2 - l1 > BISECTION_TOL * (l1 + l2).min(1.0) && steps < MAX_BISECTIONS {
            let lmid = 0.5 * (l1 + l2);
            self.candidate(dc, rho, lmid, &mut candidate);

            let volume: f64 = candidate.iter().sum();
            if volume > target {
                l1 = lmid;
            } else {
                l2 = lmid;
            }
            steps += 1;
        }

        debug!(
            lambda = 0.5 * (l1 + l2),
            bisections = steps,
            volume = candidate.iter().sum::<f64>(),
            target,
            "optimality criteria update"
        );

        DensityGrid::new(density.shape(), candidate)
    }

    /// Candidate densities for multiplier `lambda`
    fn candidate(&self, dc: &[f64], rho: &[f64], lambda: f64, out: &mut [f64]) {
        for ((x, &r), &d) in out.iter_mut().zip(rho).zip(dc) {
            let scaled = r * (-d / lambda).max(0.0).sqrt();
            *x = scaled
                .clamp(r - self.move_limit, r + self.move_limit)
                .clamp(self.rho_min, 1.0);
        }
    }
}

impl Default for DensityUpdater {
    fn default() -> Self {
        Self::new(0.2, 1e-3)
    }
}
