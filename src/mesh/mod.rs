pub mod topology;
pub mod geometry;
pub mod grid;

pub use topology::{Connectivity, HexElement};
pub use geometry::{Geometry, HexMesh};
pub use grid::{DensityGrid, GridShape};
