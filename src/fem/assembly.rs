use sprs::{CsMat, TriMat};
use rayon::prelude::*;
use crate::error::{TopOptError, TopOptResult};
use crate::fem::{DofManager, ElementStiffness};
use crate::mechanics::MaterialModel;
use crate::mesh::{DensityGrid, HexElement, HexMesh};

/// Entries contributed by one Hex8 element (24 × 24)
const ELEMENT_ENTRIES: usize = 24 * 24;

/// Global matrix assembler
pub struct Assembler;

impl Assembler {
    /// Penalized stiffness scale of every cell, `E(ρ) / E_solid`
    pub fn element_scales(density: &DensityGrid, material: &MaterialModel, penal: f64) -> Vec<f64> {
        density
            .as_slice()
            .iter()
            .map(|&rho| material.stiffness_scale(rho, penal))
            .collect()
    }

    /// Assemble the global stiffness matrix of a voxel mesh for the current densities
    ///
    /// K = Σ_e s(ρ_e) K_e
    ///
    /// # Arguments
    /// * `mesh` - Voxel mesh (connectivity and cell ownership)
    /// * `density` - Current density grid
    /// * `ke` - Reference element stiffness matrix
    /// * `material` - SIMP interpolation
    /// * `penal` - Penalization exponent
    /// * `parallel` - Use the Rayon element loop
    ///
    /// # Returns
    /// Global stiffness matrix in CSR format
    pub fn assemble(
        mesh: &HexMesh,
        density: &DensityGrid,
        ke: &ElementStiffness,
        material: &MaterialModel,
        penal: f64,
        parallel: bool,
    ) -> TopOptResult<CsMat<f64>> {
        if density.shape() != mesh.shape() {
            return Err(TopOptError::assembly(format!(
                "density grid shape {:?} does not match mesh shape {:?}",
                density.shape(),
                mesh.shape()
            )));
        }
        let scales = Self::element_scales(density, material, penal);
        if parallel {
            Self::assemble_parallel(mesh.elements(), mesh.num_dofs(), &scales, ke)
        } else {
            Self::assemble_serial(mesh.elements(), mesh.num_dofs(), &scales, ke)
        }
    }

    /// Validate one element against the DOF range and the scale table
    fn checked_element_dofs(
        e: usize,
        elem: &HexElement,
        n_dofs: usize,
        scales: &[f64],
    ) -> TopOptResult<([usize; 24], f64)> {
        let dofs = DofManager::element_dofs(elem);
        if let Some(&bad) = dofs.iter().find(|&&d| d >= n_dofs) {
            return Err(TopOptError::assembly(format!(
                "element {} maps to DOF {} but ndof = {}",
                e, bad, n_dofs
            )));
        }
        let scale = *scales.get(elem.cell).ok_or_else(|| {
            TopOptError::assembly(format!(
                "element {} references cell {} outside the density grid ({} cells)",
                e,
                elem.cell,
                scales.len()
            ))
        })?;
        if !scale.is_finite() {
            return Err(TopOptError::assembly(format!(
                "element {} has non-finite stiffness scale {}",
                e, scale
            )));
        }
        Ok((dofs, scale))
    }

    /// Assemble global stiffness matrix (serial version)
    ///
    /// `scales` is indexed by cell; element `e` uses `scales[elements[e].cell]`.
    pub fn assemble_serial(
        elements: &[HexElement],
        n_dofs: usize,
        scales: &[f64],
        ke: &ElementStiffness,
    ) -> TopOptResult<CsMat<f64>> {
        if elements.is_empty() {
            return Err(TopOptError::assembly("connectivity is empty"));
        }

        // Use triplet format for efficient insertion during assembly
        let mut triplets = TriMat::with_capacity((n_dofs, n_dofs), elements.len() * ELEMENT_ENTRIES);

        for (e, elem) in elements.iter().enumerate() {
            let (dofs, scale) = Self::checked_element_dofs(e, elem, n_dofs, scales)?;

            for i in 0..24 {
                for j in 0..24 {
                    triplets.add_triplet(dofs[i], dofs[j], scale * ke[(i, j)]);
                }
            }
        }

        // Duplicate (row, col) entries are summed on conversion
        Ok(triplets.to_csr())
    }

    /// Assemble global stiffness matrix (parallel version using Rayon)
    ///
    /// Each element builds its own scaled triplet list in parallel; the lists
    /// are merged serially in element order, so the result is identical to
    /// [`Assembler::assemble_serial`].
    pub fn assemble_parallel(
        elements: &[HexElement],
        n_dofs: usize,
        scales: &[f64],
        ke: &ElementStiffness,
    ) -> TopOptResult<CsMat<f64>> {
        if elements.is_empty() {
            return Err(TopOptError::assembly("connectivity is empty"));
        }

        let local_triplets: Vec<Vec<(usize, usize, f64)>> = elements
            .par_iter()
            .enumerate()
            .map(|(e, elem)| -> TopOptResult<Vec<(usize, usize, f64)>> {
                let (dofs, scale) = Self::checked_element_dofs(e, elem, n_dofs, scales)?;

                let mut elem_triplets = Vec::with_capacity(ELEMENT_ENTRIES);
                for i in 0..24 {
                    for j in 0..24 {
                        elem_triplets.push((dofs[i], dofs[j], scale * ke[(i, j)]));
                    }
                }
                Ok(elem_triplets)
            })
            .collect::<TopOptResult<_>>()?;

        // Merge all triplets
        let mut triplets = TriMat::with_capacity((n_dofs, n_dofs), elements.len() * ELEMENT_ENTRIES);
        for elem_triplets in local_triplets {
            for (i, j, val) in elem_triplets {
                triplets.add_triplet(i, j, val);
            }
        }

        Ok(triplets.to_csr())
    }
}
