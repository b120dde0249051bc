pub mod solver;
pub mod direct;
pub mod iterative;
pub mod preconditioner;
pub mod constrained;

pub use solver::{LinearOperator, SolveFailure, Solver, SolverStats, SolverUtils};
pub use direct::DirectSolver;
pub use iterative::ConjugateGradient;
pub use preconditioner::{IdentityPreconditioner, JacobiPreconditioner, Preconditioner};
pub use constrained::{LinearSolver, SolverStrategy, AUTO_DIRECT_LIMIT, MIN_FIXED_DOFS};
