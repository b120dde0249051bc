use nalgebra::{SMatrix, SVector, Vector3};
use crate::error::TopOptResult;
use crate::fem::{GaussQuadrature, Hex8Basis};
use crate::mechanics::{IsotropicElasticity, StrainDisplacement};

/// 24×24 stiffness matrix of one Hex8 element (8 nodes × 3 DOFs)
pub type ElementStiffness = SMatrix<f64, 24, 24>;

/// Local displacement vector of one Hex8 element, ordered
/// [u_0x, u_0y, u_0z, u_1x, ..., u_7z]
pub type ElementDisplacement = SVector<f64, 24>;

/// Element stiffness formulation for linear elastic Hex8 elements
pub struct ElementFormulator;

impl ElementFormulator {
    /// Reference element stiffness matrix for a unit cube of material (E, ν)
    ///
    /// Fails only when (E, ν) make the constitutive matrix degenerate.
    #[allow(non_snake_case)]
    pub fn stiffness(E: f64, nu: f64) -> TopOptResult<ElementStiffness> {
        let material = IsotropicElasticity::new(E, nu)?;
        Ok(Self::stiffness_for_box(&material, &Vector3::new(1.0, 1.0, 1.0)))
    }

    /// Element stiffness matrix for an axis-aligned box element
    ///
    /// K_e = ∫ B^T D B dV
    ///
    /// where:
    /// - B is the strain-displacement matrix (6×24)
    /// - D is the constitutive matrix (6×6)
    /// - Integration with 2×2×2 Gauss quadrature, exact for box elements
    ///
    /// # Arguments
    /// * `material` - Elastic material properties (E, ν)
    /// * `size` - Element edge lengths (hx, hy, hz)
    ///
    /// # Returns
    /// 24×24 symmetric positive semi-definite element stiffness matrix
    #[allow(non_snake_case)]
    pub fn stiffness_for_box(
        material: &IsotropicElasticity,
        size: &Vector3<f64>,
    ) -> ElementStiffness {
        let mut K_elem = ElementStiffness::zeros();

        let D = material.constitutive_matrix();
        let quad = GaussQuadrature::hex_2x2x2();
        let det_J = Hex8Basis::box_jacobian_det(size);

        for (qp, weight) in quad.points.iter().zip(quad.weights.iter()) {
            let dN_dx = Hex8Basis::shape_derivatives_box(qp[0], qp[1], qp[2], size);
            let B = StrainDisplacement::compute_b_matrix(&dN_dx);

            let DB = D * B;
            K_elem += (weight * det_J) * (B.transpose() * DB);
        }

        // Remove round-off asymmetry from the quadrature sum
        (K_elem + K_elem.transpose()) * 0.5
    }

    /// Strain energy product `u_eᵀ · K_e · u_e`
    pub fn energy_product(ke: &ElementStiffness, ue: &ElementDisplacement) -> f64 {
        ue.dot(&(ke * ue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::error::TopOptError;

    #[test]
    fn test_stiffness_symmetry() {
        let ke = ElementFormulator::stiffness(1.0, 0.3).unwrap();
        assert_eq!(ke.nrows(), 24);
        assert_eq!(ke.ncols(), 24);

        for i in 0..24 {
            for j in 0..24 {
                assert_relative_eq!(ke[(i, j)], ke[(j, i)], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_stiffness_positive_semidefinite() {
        // Six rigid body modes, eighteen deformation modes
        let ke = ElementFormulator::stiffness(1.0, 0.3).unwrap();

        let eigen = ke.symmetric_eigen();
        let mut eigenvalues: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
        eigenvalues.sort_by(|a, b| a.total_cmp(b));

        let largest = eigenvalues[23];
        for (i, &lambda) in eigenvalues.iter().enumerate() {
            assert!(lambda >= -1e-10 * largest, "eigenvalue {} = {} is negative", i, lambda);
        }
        for i in 0..6 {
            assert!(eigenvalues[i].abs() < 1e-10 * largest, "eigenvalue {} = {} should be a rigid mode", i, eigenvalues[i]);
        }
        for i in 6..24 {
            assert!(eigenvalues[i] > 1e-6 * largest, "eigenvalue {} = {} should be positive", i, eigenvalues[i]);
        }
    }

    #[test]
    fn test_rigid_translation_is_force_free() {
        let ke = ElementFormulator::stiffness(1.0, 0.3).unwrap();
        for axis in 0..3 {
            let mut u = ElementDisplacement::zeros();
            for node in 0..8 {
                u[3 * node + axis] = 1.0;
            }
            let f = ke * u;
            assert!(f.amax() < 1e-12);
        }
    }

    #[test]
    fn test_uniaxial_strain_energy() {
        // u_x = x on a box: ε_xx = 1, everything else zero, so
        // uᵀ K u = D_00 · volume
        let material = IsotropicElasticity::new(2.0, 0.25).unwrap();
        let size = Vector3::new(1.0, 2.0, 0.5);
        let ke = ElementFormulator::stiffness_for_box(&material, &size);

        let mut u = ElementDisplacement::zeros();
        for (node, c) in Hex8Basis::NODE_COORDS.iter().enumerate() {
            u[3 * node] = 0.5 * (1.0 + c[0]) * size.x;
        }

        let d00 = material.constitutive_matrix()[(0, 0)];
        let volume = size.x * size.y * size.z;
        assert_relative_eq!(ElementFormulator::energy_product(&ke, &u), d00 * volume, epsilon = 1e-12);
    }

    #[test]
    fn test_stiffness_scales_with_youngs_modulus_and_size() {
        let k1 = ElementFormulator::stiffness(1.0, 0.3).unwrap();
        let k2 = ElementFormulator::stiffness(2.0, 0.3).unwrap();

        let material = IsotropicElasticity::new(1.0, 0.3).unwrap();
        let k_big = ElementFormulator::stiffness_for_box(&material, &Vector3::new(3.0, 3.0, 3.0));

        for i in 0..24 {
            for j in 0..24 {
                assert_relative_eq!(k2[(i, j)], 2.0 * k1[(i, j)], epsilon = 1e-12);
                // 3D stiffness grows linearly with the element edge length
                assert_relative_eq!(k_big[(i, j)], 3.0 * k1[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = ElementFormulator::stiffness(1.0, 0.3).unwrap();
        let b = ElementFormulator::stiffness(1.0, 0.3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_material_fails() {
        assert!(matches!(
            ElementFormulator::stiffness(0.0, 0.3),
            Err(TopOptError::InvalidMaterial(_))
        ));
        assert!(matches!(
            ElementFormulator::stiffness(1.0, 0.5),
            Err(TopOptError::InvalidMaterial(_))
        ));
    }
}
