pub mod basis;
pub mod quadrature;
pub mod dof;
pub mod element;
pub mod assembly;
pub mod boundary;

pub use basis::Hex8Basis;
pub use quadrature::GaussQuadrature;
pub use dof::{DofManager, DOFS_PER_NODE};
pub use element::{ElementDisplacement, ElementFormulator, ElementStiffness};
pub use assembly::Assembler;
pub use boundary::{Face, LoadCase, PointLoad};
