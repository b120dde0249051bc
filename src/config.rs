//! Configuration management for topology optimization runs
//!
//! Reads TOML configuration files. Every key is optional and falls back to
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;
use crate::error::{TopOptError, TopOptResult};
use crate::linalg::{LinearSolver, SolverStrategy};
use crate::mechanics::MaterialModel;
use crate::mesh::GridShape;

/// Optimization parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Voxel resolution along x
    pub nelx: usize,
    /// Voxel resolution along y
    pub nely: usize,
    /// Voxel resolution along z
    pub nelz: usize,
    /// Target material volume fraction
    pub volfrac: f64,
    /// SIMP penalization exponent
    pub penal: f64,
    /// Sensitivity filter radius in cells
    pub rmin: f64,
    /// Young's modulus of solid material
    #[serde(alias = "E1")]
    pub e1: f64,
    /// Young's modulus of void material
    #[serde(alias = "E2")]
    pub e2: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Convergence threshold on the max density change
    pub tol: f64,
    /// Iteration budget
    pub max_iter: usize,
    /// Largest density change per element and iteration
    pub move_limit: f64,
    /// Density floor (keeps the stiffness matrix non-singular)
    pub rho_min: f64,
    /// Linear solver for the reduced system
    pub solver: SolverStrategy,
    /// Run element loops on the rayon pool
    pub parallel: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            nelx: 50,
            nely: 50,
            nelz: 37,
            volfrac: 0.4,
            penal: 3.0,
            rmin: 1.5,
            e1: 1.0,
            e2: 1e-9,
            nu: 0.3,
            tol: 1e-3,
            max_iter: 100,
            move_limit: 0.2,
            rho_min: 1e-3,
            solver: SolverStrategy::Auto,
            parallel: true,
        }
    }
}

impl OptimizationConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TopOptResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> TopOptResult<Self> {
        let config: OptimizationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option against its admissible range
    pub fn validate(&self) -> TopOptResult<()> {
        fn check(ok: bool, key: &str, value: impl std::fmt::Display, range: &str) -> TopOptResult<()> {
            if ok {
                Ok(())
            } else {
                Err(TopOptError::invalid_config(format!(
                    "{} = {} is outside {}",
                    key, value, range
                )))
            }
        }

        check(self.nelx > 0, "nelx", self.nelx, "(0, ∞)")?;
        check(self.nely > 0, "nely", self.nely, "(0, ∞)")?;
        check(self.nelz > 0, "nelz", self.nelz, "(0, ∞)")?;
        check(self.volfrac > 0.0 && self.volfrac <= 1.0, "volfrac", self.volfrac, "(0, 1]")?;
        check(self.penal >= 1.0 && self.penal.is_finite(), "penal", self.penal, "[1, ∞)")?;
        check(self.rmin >= 0.0 && self.rmin.is_finite(), "rmin", self.rmin, "[0, ∞)")?;
        check(self.e1 > 0.0 && self.e1.is_finite(), "e1", self.e1, "(0, ∞)")?;
        check(self.e2 >= 0.0 && self.e2 < self.e1, "e2", self.e2, "[0, e1)")?;
        check(self.nu > -1.0 && self.nu < 0.5, "nu", self.nu, "(-1, 0.5)")?;
        check(self.tol > 0.0 && self.tol.is_finite(), "tol", self.tol, "(0, ∞)")?;
        check(self.max_iter > 0, "max_iter", self.max_iter, "(0, ∞)")?;
        check(
            self.move_limit > 0.0 && self.move_limit <= 1.0,
            "move_limit",
            self.move_limit,
            "(0, 1]",
        )?;
        check(self.rho_min > 0.0 && self.rho_min < 1.0, "rho_min", self.rho_min, "(0, 1)")?;
        Ok(())
    }

    /// Voxel grid dimensions
    pub fn grid_shape(&self) -> GridShape {
        GridShape::new(self.nelx, self.nely, self.nelz)
    }

    /// Solid/void material pair
    pub fn material(&self) -> TopOptResult<MaterialModel> {
        MaterialModel::new(self.e1, self.e2, self.nu)
    }

    pub fn linear_solver(&self) -> LinearSolver {
        LinearSolver::new(self.solver)
    }

    /// Log the configuration
    pub fn log_summary(&self) {
        info!(
            nelx = self.nelx,
            nely = self.nely,
            nelz = self.nelz,
            "voxel grid"
        );
        info!(
            volfrac = self.volfrac,
            penal = self.penal,
            rmin = self.rmin,
            move_limit = self.move_limit,
            rho_min = self.rho_min,
            "SIMP parameters"
        );
        info!(e1 = self.e1, e2 = self.e2, nu = self.nu, "material");
        info!(
            tol = self.tol,
            max_iter = self.max_iter,
            solver = ?self.solver,
            parallel = self.parallel,
            "iteration control"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OptimizationConfig::default();
        assert_eq!(config.grid_shape(), GridShape::new(50, 50, 37));
        assert_eq!(config.max_iter, 100);
        assert_eq!(config.solver, SolverStrategy::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config() {
        let config = OptimizationConfig::from_toml_str(
            r#"
            nelx = 20
            nely = 10
            nelz = 4
            volfrac = 0.3
            E1 = 200.0
            E2 = 1e-6
            solver = "conjugate_gradient"
            parallel = false
            "#,
        )
        .unwrap();

        assert_eq!(config.grid_shape(), GridShape::new(20, 10, 4));
        assert_eq!(config.volfrac, 0.3);
        assert_eq!(config.e1, 200.0);
        assert_eq!(config.e2, 1e-6);
        assert_eq!(config.solver, SolverStrategy::ConjugateGradient);
        assert!(!config.parallel);
        // Untouched keys keep their defaults
        assert_eq!(config.penal, 3.0);
        assert_eq!(config.rmin, 1.5);
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = OptimizationConfig::from_toml_str("volfrac = 1.5").unwrap_err();
        assert!(matches!(err, TopOptError::InvalidConfig(ref msg) if msg.contains("volfrac")));

        let err = OptimizationConfig::from_toml_str("e2 = 2.0").unwrap_err();
        assert!(format!("{err}").contains("e2"));

        let config = OptimizationConfig {
            penal: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            OptimizationConfig::from_toml_str("nelx = \"many\""),
            Err(TopOptError::ConfigParse(_))
        ));
        assert!(matches!(
            OptimizationConfig::from_file("/nonexistent/topopt.toml"),
            Err(TopOptError::ConfigIo(_))
        ));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = OptimizationConfig {
            nelx: 8,
            solver: SolverStrategy::Direct,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(OptimizationConfig::from_toml_str(&text).unwrap(), config);
    }
}
