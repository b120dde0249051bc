use crate::error::{TopOptError, TopOptResult};

/// Dimensions of a structured voxel grid (cells per axis)
///
/// Cells are numbered x-fastest: `cell = i + nx * (j + ny * k)`.
/// The node lattice has one more entry per axis and uses the same ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridShape {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Total number of cells (design elements)
    pub fn num_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Total number of lattice nodes
    pub fn num_nodes(&self) -> usize {
        (self.nx + 1) * (self.ny + 1) * (self.nz + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.num_cells() == 0
    }

    /// Linear cell index of cell (i, j, k)
    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        i + self.nx * (j + self.ny * k)
    }

    /// Inverse of [`GridShape::cell_index`]
    pub fn cell_coords(&self, cell: usize) -> (usize, usize, usize) {
        let i = cell % self.nx;
        let j = (cell / self.nx) % self.ny;
        let k = cell / (self.nx * self.ny);
        (i, j, k)
    }

    /// Linear index of lattice node (i, j, k), with i in 0..=nx etc.
    pub fn node_index(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i <= self.nx && j <= self.ny && k <= self.nz);
        i + (self.nx + 1) * (j + (self.ny + 1) * k)
    }
}

/// Per-cell material density field
///
/// Values live in `[rho_min, 1]` once the optimizer owns the grid. The raw
/// occupancy handed over by a voxelizer may still contain zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    shape: GridShape,
    values: Vec<f64>,
}

impl DensityGrid {
    /// Wrap a value vector, checking it matches the grid shape
    pub fn new(shape: GridShape, values: Vec<f64>) -> TopOptResult<Self> {
        if values.len() != shape.num_cells() {
            return Err(TopOptError::invalid_mesh(format!(
                "density grid has {} values but shape {}x{}x{} needs {}",
                values.len(),
                shape.nx,
                shape.ny,
                shape.nz,
                shape.num_cells()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Grid with every cell at the same density
    pub fn uniform(shape: GridShape, value: f64) -> Self {
        Self {
            shape,
            values: vec![value; shape.num_cells()],
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Sum of all densities (material volume in cell units)
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Mean density
    pub fn volume_fraction(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.total() / self.values.len() as f64
        }
    }

    /// Largest absolute per-cell difference to another grid of the same shape
    pub fn max_abs_diff(&self, other: &DensityGrid) -> f64 {
        debug_assert_eq!(self.shape, other.shape);
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Clamp every value into `[lower, upper]`
    pub fn clamp(&mut self, lower: f64, upper: f64) {
        for v in &mut self.values {
            *v = v.clamp(lower, upper);
        }
    }

    /// Binary occupancy (1.0 solid, 0.0 void) for re-meshing or printing
    pub fn threshold(&self, cutoff: f64) -> Vec<f64> {
        self.values
            .iter()
            .map(|&v| if v >= cutoff { 1.0 } else { 0.0 })
            .collect()
    }
}
