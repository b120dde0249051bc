/// SIMP compliance minimization
///
/// This module provides:
/// - Element sensitivities of compliance and the checkerboard filter
/// - Optimality Criteria density update with λ bisection
/// - The iteration driver with progress callback and cancellation

pub mod sensitivity;
pub mod filter;
pub mod oc;
pub mod driver;

pub use sensitivity::SensitivityAnalyzer;
pub use filter::SensitivityFilter;
pub use oc::DensityUpdater;
pub use driver::{
    IterationProgress, IterationRecord, OptimizationDriver, OptimizationOutcome, RunState,
};
