//! Error types for topology optimization.

use thiserror::Error;

/// Result type alias for fallible optimization operations.
pub type TopOptResult<T> = Result<T, TopOptError>;

/// Errors that abort an optimization run.
///
/// Recoverable per-iteration problems (a bad sensitivity evaluation, a failed
/// density update) are not represented here: those components degrade to a
/// neutral result and log a warning instead.
#[derive(Debug, Error)]
pub enum TopOptError {
    /// Voxel model is empty or its grid, nodes and elements disagree.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// A DOF index or matrix shape was out of range during the scatter.
    #[error("assembly failed: {0}")]
    Assembly(String),

    /// The reduced stiffness system cannot be solved uniquely.
    #[error("singular system ({free} free / {fixed} fixed DOFs): {reason}")]
    SingularSystem {
        free: usize,
        fixed: usize,
        reason: String,
    },

    /// The solve finished but produced non-finite values.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// Material constants that make the constitutive matrix degenerate.
    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    /// Fixed DOFs or point loads referencing nonexistent DOFs.
    #[error("invalid load case: {0}")]
    InvalidLoadCase(String),

    /// Configuration option outside its admissible range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file is not valid TOML for [`crate::OptimizationConfig`].
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl TopOptError {
    /// Create an invalid mesh error.
    #[must_use]
    pub fn invalid_mesh(details: impl Into<String>) -> Self {
        Self::InvalidMesh(details.into())
    }

    /// Create an assembly error.
    #[must_use]
    pub fn assembly(details: impl Into<String>) -> Self {
        Self::Assembly(details.into())
    }

    /// Create a singular system error with the DOF partition that produced it.
    #[must_use]
    pub fn singular(free: usize, fixed: usize, reason: impl Into<String>) -> Self {
        Self::SingularSystem {
            free,
            fixed,
            reason: reason.into(),
        }
    }

    /// Create a numerical failure error.
    #[must_use]
    pub fn numerical(details: impl Into<String>) -> Self {
        Self::NumericalFailure(details.into())
    }

    /// Create an invalid material error.
    #[must_use]
    pub fn invalid_material(details: impl Into<String>) -> Self {
        Self::InvalidMaterial(details.into())
    }

    /// Create an invalid load case error.
    #[must_use]
    pub fn invalid_load_case(details: impl Into<String>) -> Self {
        Self::InvalidLoadCase(details.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }

    /// Whether the error came from the linear solve (singular or non-finite).
    #[must_use]
    pub fn is_solver_failure(&self) -> bool {
        matches!(self, Self::SingularSystem { .. } | Self::NumericalFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TopOptError::invalid_mesh("no elements");
        assert!(format!("{err}").contains("no elements"));

        let err = TopOptError::singular(10, 0, "no fixed DOFs");
        let msg = format!("{err}");
        assert!(msg.contains("10 free"));
        assert!(msg.contains("0 fixed"));
        assert!(msg.contains("no fixed DOFs"));

        let err = TopOptError::assembly("dof 99 >= 24");
        assert!(format!("{err}").contains("dof 99"));
    }

    #[test]
    fn test_solver_failure_classification() {
        assert!(TopOptError::singular(1, 1, "x").is_solver_failure());
        assert!(TopOptError::numerical("nan").is_solver_failure());
        assert!(!TopOptError::invalid_config("penal").is_solver_failure());
    }
}
