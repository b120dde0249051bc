/// Solid mechanics module for linear elasticity
///
/// This module provides implementations for:
/// - Linear elastic constitutive model and SIMP material interpolation
/// - Strain-displacement relationships

pub mod constitutive;
pub mod strain;

pub use constitutive::{IsotropicElasticity, MaterialModel};
pub use strain::StrainDisplacement;
