/// Strain-displacement relationships for solid mechanics
///
/// Implements the B-matrix that relates nodal displacements to element strains.

use nalgebra::SMatrix;

/// Strain-displacement matrix computations
pub struct StrainDisplacement;

impl StrainDisplacement {
    /// Compute 6×24 strain-displacement matrix B from shape function derivatives
    ///
    /// Relates nodal displacements to element strains: ε = B · u_e
    ///
    /// # Arguments
    /// * `dN_dx` - Shape function derivatives [∂N_i/∂x, ∂N_i/∂y, ∂N_i/∂z] for i=0..7
    ///
    /// # Returns
    /// B matrix (6×24) where:
    /// - Rows: [ε_xx, ε_yy, ε_zz, γ_xy, γ_yz, γ_zx] (Voigt notation)
    /// - Columns: [u_0x, u_0y, u_0z, u_1x, ..., u_7z] (24 DOFs)
    ///
    /// For each node i, columns 3i, 3i+1, 3i+2 are:
    /// ```text
    ///     [∂N_i/∂x    0         0      ]   (ε_xx = ∂u_x/∂x)
    ///     [  0      ∂N_i/∂y     0      ]   (ε_yy = ∂u_y/∂y)
    ///     [  0        0      ∂N_i/∂z   ]   (ε_zz = ∂u_z/∂z)
    ///     [∂N_i/∂y  ∂N_i/∂x     0      ]   (γ_xy = ∂u_x/∂y + ∂u_y/∂x)
    ///     [  0      ∂N_i/∂z  ∂N_i/∂y   ]   (γ_yz = ∂u_y/∂z + ∂u_z/∂y)
    ///     [∂N_i/∂z    0      ∂N_i/∂x   ]   (γ_zx = ∂u_z/∂x + ∂u_x/∂z)
    /// ```
    ///
    /// # References
    /// - Zienkiewicz & Taylor, "The Finite Element Method", Vol. 1, Ch. 6
    #[allow(non_snake_case)]
    pub fn compute_b_matrix(dN_dx: &[[f64; 3]; 8]) -> SMatrix<f64, 6, 24> {
        let mut B = SMatrix::<f64, 6, 24>::zeros();

        for (i, grad) in dN_dx.iter().enumerate() {
            let col_base = 3 * i;
            let [dx, dy, dz] = *grad;

            B[(0, col_base)] = dx;
            B[(1, col_base + 1)] = dy;
            B[(2, col_base + 2)] = dz;

            B[(3, col_base)] = dy;
            B[(3, col_base + 1)] = dx;

            B[(4, col_base + 1)] = dz;
            B[(4, col_base + 2)] = dy;

            B[(5, col_base + 2)] = dx;
            B[(5, col_base)] = dz;
        }

        B
    }
}
