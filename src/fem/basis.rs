use nalgebra::Vector3;

/// Hex8 (8-node trilinear hexahedral) element basis functions
///
/// Node numbering follows [`crate::mesh::HexElement`]: bottom face ζ = -1
/// counter-clockwise from (-1,-1,-1), then the top face ζ = +1.
///
/// Shape functions:
///   N_i(ξ, η, ζ) = ⅛ (1 + ξ_i ξ)(1 + η_i η)(1 + ζ_i ζ)
/// where (ξ_i, η_i, ζ_i) ∈ {-1, +1}³ are the local node coordinates.
pub struct Hex8Basis;

impl Hex8Basis {
    /// Local coordinates (ξ_i, η_i, ζ_i) of the 8 nodes
    pub const NODE_COORDS: [[f64; 3]; 8] = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];

    /// Evaluate all 8 shape functions at local coordinates (ξ, η, ζ)
    pub fn shape_functions(xi: f64, eta: f64, zeta: f64) -> [f64; 8] {
        let mut n = [0.0; 8];
        for (i, c) in Self::NODE_COORDS.iter().enumerate() {
            n[i] = 0.125 * (1.0 + c[0] * xi) * (1.0 + c[1] * eta) * (1.0 + c[2] * zeta);
        }
        n
    }

    /// Evaluate shape function derivatives with respect to local coordinates
    ///
    /// ```text
    /// ∂N_i/∂ξ = ⅛ ξ_i (1 + η_i η)(1 + ζ_i ζ)
    /// ∂N_i/∂η = ⅛ η_i (1 + ξ_i ξ)(1 + ζ_i ζ)
    /// ∂N_i/∂ζ = ⅛ ζ_i (1 + ξ_i ξ)(1 + η_i η)
    /// ```
    ///
    /// # Returns
    /// Array [[∂N_i/∂ξ, ∂N_i/∂η, ∂N_i/∂ζ]; 8]
    pub fn shape_derivatives_local(xi: f64, eta: f64, zeta: f64) -> [[f64; 3]; 8] {
        let mut dn = [[0.0; 3]; 8];
        for (i, c) in Self::NODE_COORDS.iter().enumerate() {
            let fx = 1.0 + c[0] * xi;
            let fy = 1.0 + c[1] * eta;
            let fz = 1.0 + c[2] * zeta;
            dn[i] = [
                0.125 * c[0] * fy * fz,
                0.125 * c[1] * fx * fz,
                0.125 * c[2] * fx * fy,
            ];
        }
        dn
    }

    /// Shape function derivatives in physical coordinates for an axis-aligned
    /// box element with edge lengths `size = (hx, hy, hz)`
    ///
    /// The Jacobian is diagonal, `J = diag(hx/2, hy/2, hz/2)`, so
    /// ∂N/∂x = (2/hx) ∂N/∂ξ and likewise for y and z.
    pub fn shape_derivatives_box(xi: f64, eta: f64, zeta: f64, size: &Vector3<f64>) -> [[f64; 3]; 8] {
        let inv = [2.0 / size.x, 2.0 / size.y, 2.0 / size.z];
        let mut dn = Self::shape_derivatives_local(xi, eta, zeta);
        for grad in &mut dn {
            for a in 0..3 {
                grad[a] *= inv[a];
            }
        }
        dn
    }

    /// Jacobian determinant of an axis-aligned box element (constant)
    pub fn box_jacobian_det(size: &Vector3<f64>) -> f64 {
        size.x * size.y * size.z / 8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_partition_of_unity() {
        for &(xi, eta, zeta) in &[(0.0, 0.0, 0.0), (0.3, -0.7, 0.9), (-1.0, 1.0, -1.0)] {
            let n = Hex8Basis::shape_functions(xi, eta, zeta);
            assert_relative_eq!(n.iter().sum::<f64>(), 1.0, epsilon = 1e-14);

            // Derivatives of a partition of unity sum to zero
            let dn = Hex8Basis::shape_derivatives_local(xi, eta, zeta);
            for a in 0..3 {
                let s: f64 = dn.iter().map(|g| g[a]).sum();
                assert_relative_eq!(s, 0.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_kronecker_delta_at_nodes() {
        for (i, c) in Hex8Basis::NODE_COORDS.iter().enumerate() {
            let n = Hex8Basis::shape_functions(c[0], c[1], c[2]);
            for (j, &nj) in n.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(nj, expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_derivatives_match_finite_difference() {
        let (xi, eta, zeta, h) = (0.2, -0.4, 0.6, 1e-6);
        let dn = Hex8Basis::shape_derivatives_local(xi, eta, zeta);

        let plus = Hex8Basis::shape_functions(xi + h, eta, zeta);
        let minus = Hex8Basis::shape_functions(xi - h, eta, zeta);
        for i in 0..8 {
            assert_relative_eq!(dn[i][0], (plus[i] - minus[i]) / (2.0 * h), epsilon = 1e-8);
        }

        let plus = Hex8Basis::shape_functions(xi, eta, zeta + h);
        let minus = Hex8Basis::shape_functions(xi, eta, zeta - h);
        for i in 0..8 {
            assert_relative_eq!(dn[i][2], (plus[i] - minus[i]) / (2.0 * h), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_linear_field_reproduced() {
        // Interpolating u = x on a box of width 2 (x = 1 + ξ) gives ∂u/∂x = 1
        let size = Vector3::new(2.0, 1.0, 0.5);
        let dn = Hex8Basis::shape_derivatives_box(0.1, 0.2, 0.3, &size);
        let du_dx: f64 = Hex8Basis::NODE_COORDS
            .iter()
            .zip(dn.iter())
            .map(|(c, g)| (1.0 + c[0]) * g[0])
            .sum();
        assert_relative_eq!(du_dx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(Hex8Basis::box_jacobian_det(&size), 0.125, epsilon = 1e-15);
    }
}
