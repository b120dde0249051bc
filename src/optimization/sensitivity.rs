use rayon::prelude::*;
use tracing::warn;
use crate::error::{TopOptError, TopOptResult};
use crate::fem::{DofManager, ElementDisplacement, ElementFormulator, ElementStiffness};
use crate::mechanics::MaterialModel;
use crate::mesh::{DensityGrid, HexElement, HexMesh};
use super::filter::SensitivityFilter;

/// Compliance sensitivities with respect to element densities
///
/// For element e with local displacements `u_e`:
/// `dc_e = −s'(ρ_e) u_eᵀ KE u_e`, where `s` is the SIMP stiffness scale.
/// With a void modulus of zero this is `−p ρ_e^(p−1) u_eᵀ KE u_e`.
#[derive(Debug, Clone)]
pub struct SensitivityAnalyzer {
    ke: ElementStiffness,
    material: MaterialModel,
    penal: f64,
    filter: SensitivityFilter,
    parallel: bool,
}

impl SensitivityAnalyzer {
    pub fn new(
        ke: ElementStiffness,
        material: MaterialModel,
        penal: f64,
        filter: SensitivityFilter,
        parallel: bool,
    ) -> Self {
        Self {
            ke,
            material,
            penal,
            filter,
            parallel,
        }
    }

    /// Filtered sensitivities, one per cell
    ///
    /// Never fails: an internal error yields an all-zero field and a warning,
    /// which leaves the next density update to the move limits alone.
    pub fn compute(&self, mesh: &HexMesh, density: &DensityGrid, u: &[f64]) -> Vec<f64> {
        match self.try_compute(mesh, density, u) {
            Ok(dc) => dc,
            Err(e) => {
                warn!(error = %e, "sensitivity analysis failed, using a zero field");
                vec![0.0; density.len()]
            }
        }
    }

    /// Filtered sensitivities, reporting internal errors
    pub fn try_compute(&self, mesh: &HexMesh, density: &DensityGrid, u: &[f64]) -> TopOptResult<Vec<f64>> {
        let raw = self.raw_sensitivities(mesh, density, u)?;
        let dc = self.filter.apply(&raw, density.as_slice())?;
        if let Some(e) = dc.iter().position(|v| !v.is_finite()) {
            return Err(TopOptError::numerical(format!(
                "filtered sensitivity of cell {} is {}",
                e, dc[e]
            )));
        }
        Ok(dc)
    }

    /// Unfiltered per-element sensitivities
    pub fn raw_sensitivities(&self, mesh: &HexMesh, density: &DensityGrid, u: &[f64]) -> TopOptResult<Vec<f64>> {
        if u.len() != mesh.num_dofs() {
            return Err(TopOptError::numerical(format!(
                "displacement vector has {} entries, mesh has {} DOFs",
                u.len(),
                mesh.num_dofs()
            )));
        }
        if density.shape() != mesh.shape() {
            return Err(TopOptError::numerical(format!(
                "density grid shape {:?} does not match mesh shape {:?}",
                density.shape(),
                mesh.shape()
            )));
        }

        let rho = density.as_slice();
        let per_element: Vec<(usize, f64)> = if self.parallel {
            mesh.elements()
                .par_iter()
                .map(|elem| self.element_sensitivity(elem, rho, u))
                .collect::<TopOptResult<Vec<_>>>()?
        } else {
            mesh.elements()
                .iter()
                .map(|elem| self.element_sensitivity(elem, rho, u))
                .collect::<TopOptResult<Vec<_>>>()?
        };

        let mut dc = vec![0.0; density.len()];
        for (cell, value) in per_element {
            dc[cell] = value;
        }
        Ok(dc)
    }

    fn element_sensitivity(&self, elem: &HexElement, rho: &[f64], u: &[f64]) -> TopOptResult<(usize, f64)> {
        let ue = Self::gather(elem, u);
        let energy = ElementFormulator::energy_product(&self.ke, &ue);
        let rho_e = rho[elem.cell];
        let value = -self.material.stiffness_scale_derivative(rho_e, self.penal) * energy;
        if !value.is_finite() {
            return Err(TopOptError::numerical(format!(
                "sensitivity of cell {} is {} (density {}, strain energy {})",
                elem.cell, value, rho_e, energy
            )));
        }
        Ok((elem.cell, value))
    }

    /// Local displacement vector of one element
    fn gather(elem: &HexElement, u: &[f64]) -> ElementDisplacement {
        let dofs = DofManager::element_dofs(elem);
        ElementDisplacement::from_fn(|i, _| u[dofs[i]])
    }
}
