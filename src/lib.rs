pub mod error;
pub mod mesh;
pub mod mesh_generator;
pub mod fem;
pub mod linalg;
pub mod mechanics;
pub mod optimization;
pub mod config;

pub use error::{TopOptError, TopOptResult};
pub use mesh::{DensityGrid, GridShape, HexElement, HexMesh};
pub use mesh_generator::{Resolution, StructuredVoxelizer, VoxelModel, Voxelizer};
pub use fem::{Assembler, DofManager, ElementFormulator, ElementStiffness, Face, LoadCase, PointLoad};
pub use linalg::{ConjugateGradient, DirectSolver, LinearSolver, Solver, SolverStats, SolverStrategy};
pub use mechanics::{IsotropicElasticity, MaterialModel};
pub use optimization::{
    DensityUpdater, IterationProgress, OptimizationDriver, OptimizationOutcome, RunState,
    SensitivityAnalyzer, SensitivityFilter,
};
pub use config::OptimizationConfig;
