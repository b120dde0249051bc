/// Gaussian quadrature rules for hexahedral elements
///
/// Points are given in local coordinates (ξ, η, ζ) of the reference cube [-1, 1]³.
pub struct GaussQuadrature {
    /// Integration point coordinates [ξ, η, ζ]
    pub points: Vec<[f64; 3]>,
    /// Integration weights
    pub weights: Vec<f64>,
}

impl GaussQuadrature {
    /// 2×2×2 Gauss-Legendre rule, points at ±1/√3, unit weights
    ///
    /// Exact for polynomials of degree 3 in each local coordinate, which
    /// integrates the trilinear Hex8 stiffness exactly on box elements
    pub fn hex_2x2x2() -> Self {
        let g = 1.0 / 3.0_f64.sqrt();
        let gp = [-g, g];

        let mut points = Vec::with_capacity(8);
        for &zeta in &gp {
            for &eta in &gp {
                for &xi in &gp {
                    points.push([xi, eta, zeta]);
                }
            }
        }

        Self {
            points,
            weights: vec![1.0; 8],
        }
    }

    /// Get the number of integration points
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum() {
        // Weights sum to the volume of the reference cube
        let rule = GaussQuadrature::hex_2x2x2();
        let sum: f64 = rule.weights.iter().sum();
        assert_relative_eq!(sum, 8.0, epsilon = 1e-14);
    }

    #[test]
    fn test_polynomial_exactness() {
        // ∫∫∫ ξ² η² ζ² over [-1,1]³ = (2/3)³
        let rule = GaussQuadrature::hex_2x2x2();
        assert_eq!(rule.num_points(), 8);

        let integral: f64 = rule
            .points
            .iter()
            .zip(rule.weights.iter())
            .map(|(p, w)| p[0] * p[0] * p[1] * p[1] * p[2] * p[2] * w)
            .sum();

        assert_relative_eq!(integral, (2.0_f64 / 3.0).powi(3), epsilon = 1e-14);
    }
}
