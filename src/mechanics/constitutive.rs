/// Constitutive models for solid mechanics
///
/// Implements the material stiffness matrix (D) that relates stress to strain,
/// and the SIMP interpolation between solid and void material.

use nalgebra::SMatrix;
use crate::error::{TopOptError, TopOptResult};

/// Isotropic linear elastic material
///
/// Characterized by Young's modulus E and Poisson's ratio ν.
/// Valid for small strains and linear elastic behavior.
///
/// # References
/// - Timoshenko & Goodier, "Theory of Elasticity"
/// - Zienkiewicz & Taylor, "The Finite Element Method", Vol. 1
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicElasticity {
    pub youngs_modulus: f64,  // E
    pub poisson_ratio: f64,   // ν (dimensionless)
}

impl IsotropicElasticity {
    /// Create new isotropic elastic material
    ///
    /// # Arguments
    /// * `youngs_modulus` - Young's modulus E, must be > 0
    /// * `poisson_ratio` - Poisson's ratio ν, must be in (-1, 0.5) so that
    ///   `(1+ν)(1-2ν) > 0`
    pub fn new(youngs_modulus: f64, poisson_ratio: f64) -> TopOptResult<Self> {
        if !(youngs_modulus.is_finite() && youngs_modulus > 0.0) {
            return Err(TopOptError::invalid_material(format!(
                "Young's modulus must be positive, got {}",
                youngs_modulus
            )));
        }
        let denom = (1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio);
        if !(poisson_ratio.is_finite() && poisson_ratio > -1.0 && poisson_ratio < 0.5)
            || denom.abs() < 1e-12
        {
            return Err(TopOptError::invalid_material(format!(
                "Poisson's ratio must be in (-1, 0.5), got {}",
                poisson_ratio
            )));
        }

        Ok(Self {
            youngs_modulus,
            poisson_ratio,
        })
    }

    /// Compute 6×6 constitutive matrix D for 3D elasticity
    ///
    /// Relates stress to strain in Voigt notation: σ = D ε
    ///
    /// Voigt ordering: [σ_xx, σ_yy, σ_zz, σ_xy, σ_yz, σ_zx]^T
    ///
    /// For isotropic material:
    /// ```text
    /// D = (E / ((1+ν)(1-2ν))) ×
    ///     [1-ν    ν    ν    0      0      0   ]
    ///     [ ν   1-ν    ν    0      0      0   ]
    ///     [ ν    ν   1-ν    0      0      0   ]
    ///     [ 0    0    0  (1-2ν)/2  0      0   ]
    ///     [ 0    0    0    0   (1-2ν)/2   0   ]
    ///     [ 0    0    0    0      0   (1-2ν)/2]
    /// ```
    #[allow(non_snake_case)]
    pub fn constitutive_matrix(&self) -> SMatrix<f64, 6, 6> {
        let E = self.youngs_modulus;
        let nu = self.poisson_ratio;

        let factor = E / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let diag = 1.0 - nu;
        let off_diag = nu;
        let shear = (1.0 - 2.0 * nu) / 2.0;

        let mut D = SMatrix::<f64, 6, 6>::zeros();

        // Normal stress block
        for i in 0..3 {
            for j in 0..3 {
                D[(i, j)] = if i == j { diag } else { off_diag };
            }
        }

        // Shear block
        D[(3, 3)] = shear;
        D[(4, 4)] = shear;
        D[(5, 5)] = shear;

        D * factor
    }

    /// Compute Lamé parameters (λ, μ)
    #[allow(non_snake_case)]
    pub fn lame_parameters(&self) -> (f64, f64) {
        let E = self.youngs_modulus;
        let nu = self.poisson_ratio;

        let lambda = (E * nu) / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = E / (2.0 * (1.0 + nu));

        (lambda, mu)
    }
}

/// Solid/void material pair with SIMP interpolation
///
/// `E(ρ) = E_void + ρ^p (E_solid − E_void)`. Element stiffness matrices are
/// formulated once with `E_solid`, so each element is scaled by
/// `E(ρ) / E_solid`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialModel {
    /// Solid material (E1, ν)
    pub solid: IsotropicElasticity,
    /// Young's modulus of void material (E2), `0 <= E2 < E1`
    pub void_modulus: f64,
}

impl MaterialModel {
    pub fn new(e_solid: f64, e_void: f64, poisson_ratio: f64) -> TopOptResult<Self> {
        let solid = IsotropicElasticity::new(e_solid, poisson_ratio)?;
        if !(e_void.is_finite() && e_void >= 0.0 && e_void < e_solid) {
            return Err(TopOptError::invalid_material(format!(
                "void modulus must be in [0, {}), got {}",
                e_solid, e_void
            )));
        }
        Ok(Self {
            solid,
            void_modulus: e_void,
        })
    }

    /// Pure SIMP (`E_void = 0`): scale is exactly `ρ^p`
    pub fn simp(e_solid: f64, poisson_ratio: f64) -> TopOptResult<Self> {
        Self::new(e_solid, 0.0, poisson_ratio)
    }

    fn void_ratio(&self) -> f64 {
        self.void_modulus / self.solid.youngs_modulus
    }

    /// Stiffness scale `E(ρ) / E_solid` for density `rho` and penalty `penal`
    pub fn stiffness_scale(&self, rho: f64, penal: f64) -> f64 {
        let r = self.void_ratio();
        r + rho.powf(penal) * (1.0 - r)
    }

    /// Derivative of [`MaterialModel::stiffness_scale`] with respect to `rho`
    pub fn stiffness_scale_derivative(&self, rho: f64, penal: f64) -> f64 {
        penal * rho.powf(penal - 1.0) * (1.0 - self.void_ratio())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constitutive_matrix_symmetry() {
        let mat = IsotropicElasticity::new(100e9, 0.25).unwrap();
        let d = mat.constitutive_matrix();
        for i in 0..6 {
            for j in 0..6 {
                assert_relative_eq!(d[(i, j)], d[(j, i)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_shear_term_equals_shear_modulus() {
        let mat = IsotropicElasticity::new(1.0, 0.3).unwrap();
        let d = mat.constitutive_matrix();
        let (_, mu) = mat.lame_parameters();
        assert_relative_eq!(d[(3, 3)], mu, epsilon = 1e-12);
        assert_relative_eq!(d[(5, 5)], mu, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_material_rejected() {
        assert!(IsotropicElasticity::new(0.0, 0.3).is_err());
        assert!(IsotropicElasticity::new(-1.0, 0.3).is_err());
        assert!(IsotropicElasticity::new(1.0, 0.5).is_err());
        assert!(IsotropicElasticity::new(1.0, -1.0).is_err());
        assert!(IsotropicElasticity::new(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_simp_scale_is_power_law() {
        let model = MaterialModel::simp(1.0, 0.3).unwrap();
        assert_relative_eq!(model.stiffness_scale(0.5, 3.0), 0.125, epsilon = 1e-15);
        assert_relative_eq!(model.stiffness_scale(1.0, 3.0), 1.0, epsilon = 1e-15);
        assert_relative_eq!(model.stiffness_scale_derivative(0.5, 3.0), 0.75, epsilon = 1e-15);
    }

    #[test]
    fn test_modified_simp_floor() {
        let model = MaterialModel::new(1.0, 1e-3, 0.3).unwrap();
        assert_relative_eq!(model.stiffness_scale(0.0, 3.0), 1e-3, epsilon = 1e-15);
        assert_relative_eq!(model.stiffness_scale(1.0, 3.0), 1.0, epsilon = 1e-15);

        assert!(MaterialModel::new(1.0, 1.0, 0.3).is_err());
        assert!(MaterialModel::new(1.0, -1e-9, 0.3).is_err());
    }

    #[test]
    fn test_scale_derivative_matches_finite_difference() {
        let model = MaterialModel::new(2.0, 1e-4, 0.3).unwrap();
        let (rho, p, h) = (0.4, 3.0, 1e-6);
        let fd = (model.stiffness_scale(rho + h, p) - model.stiffness_scale(rho - h, p)) / (2.0 * h);
        assert_relative_eq!(model.stiffness_scale_derivative(rho, p), fd, epsilon = 1e-8);
    }
}
