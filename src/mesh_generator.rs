use nalgebra::{Point3, Vector3};
use tracing::debug;
use crate::error::{TopOptError, TopOptResult};
use crate::mesh::{DensityGrid, GridShape, HexElement, HexMesh};

/// Requested voxel resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Cell counts per axis; the pitch is the longest extent divided by the
    /// largest count, so cells stay cubic
    Cells(usize, usize, usize),
    /// Edge length of one cubic voxel
    Pitch(f64),
}

/// Raw output of a voxelizer: occupancy plus hexahedral node/element tables
///
/// `elements[e]` holds the 8 node indices of the element owning cell `e`, with
/// cells numbered x-fastest as in [`GridShape::cell_index`].
#[derive(Debug, Clone)]
pub struct VoxelModel {
    pub shape: GridShape,
    /// 1.0 solid, 0.0 void, one value per cell
    pub occupancy: Vec<f64>,
    pub nodes: Vec<Point3<f64>>,
    pub elements: Vec<[usize; 8]>,
}

impl VoxelModel {
    /// Validate the model and split it into a mesh and the raw occupancy grid
    pub fn into_parts(self) -> TopOptResult<(HexMesh, DensityGrid)> {
        if let Some((cell, v)) = self
            .occupancy
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && (0.0..=1.0).contains(*v)))
        {
            return Err(TopOptError::invalid_mesh(format!(
                "occupancy of cell {} is {}, expected a value in [0, 1]",
                cell, v
            )));
        }
        let occupancy = DensityGrid::new(self.shape, self.occupancy)?;

        let elements = self
            .elements
            .into_iter()
            .enumerate()
            .map(|(cell, nodes)| HexElement::new(nodes, cell))
            .collect();
        let mesh = HexMesh::new(self.shape, self.nodes, elements)?;

        Ok((mesh, occupancy))
    }
}

/// Turns a solid description into a voxel model
///
/// Surface-mesh loading and ray-cast voxelization live outside this crate;
/// implement this trait to plug them into the optimizer.
pub trait Voxelizer {
    /// Solid representation consumed by this voxelizer
    type Solid: ?Sized;

    fn voxelize(&self, solid: &Self::Solid, resolution: Resolution) -> TopOptResult<VoxelModel>;
}

/// Lattice voxelizer over an axis-aligned box
///
/// Samples an inside/outside predicate at cell centres. Also builds the
/// lattice for callers that already own an occupancy array.
#[derive(Debug, Clone)]
pub struct StructuredVoxelizer {
    /// Minimum corner of the box
    pub origin: Point3<f64>,
    /// Box size along x, y, z
    pub extent: Vector3<f64>,
}

impl StructuredVoxelizer {
    pub fn new(origin: Point3<f64>, extent: Vector3<f64>) -> Self {
        Self { origin, extent }
    }

    /// Fully solid box of `nx × ny × nz` cubic voxels with edge `pitch`
    pub fn solid_box(nx: usize, ny: usize, nz: usize, pitch: f64) -> TopOptResult<VoxelModel> {
        let shape = GridShape::new(nx, ny, nz);
        Self::from_occupancy(shape, vec![1.0; shape.num_cells()], pitch)
    }

    /// Build the node lattice and element table for a given occupancy array
    ///
    /// Node (i, j, k) sits at `pitch · (i, j, k)`.
    pub fn from_occupancy(
        shape: GridShape,
        occupancy: Vec<f64>,
        pitch: f64,
    ) -> TopOptResult<VoxelModel> {
        Self::lattice(shape, occupancy, Point3::origin(), pitch)
    }

    fn lattice(
        shape: GridShape,
        occupancy: Vec<f64>,
        origin: Point3<f64>,
        pitch: f64,
    ) -> TopOptResult<VoxelModel> {
        if shape.is_empty() {
            return Err(TopOptError::invalid_mesh("voxel grid has zero cells"));
        }
        if !(pitch.is_finite() && pitch > 0.0) {
            return Err(TopOptError::invalid_mesh(format!(
                "voxel pitch must be positive, got {}",
                pitch
            )));
        }
        if occupancy.len() != shape.num_cells() {
            return Err(TopOptError::invalid_mesh(format!(
                "occupancy has {} values for {} cells",
                occupancy.len(),
                shape.num_cells()
            )));
        }

        let mut nodes = Vec::with_capacity(shape.num_nodes());
        for k in 0..=shape.nz {
            for j in 0..=shape.ny {
                for i in 0..=shape.nx {
                    nodes.push(Point3::new(
                        origin.x + i as f64 * pitch,
                        origin.y + j as f64 * pitch,
                        origin.z + k as f64 * pitch,
                    ));
                }
            }
        }

        let mut elements = Vec::with_capacity(shape.num_cells());
        for k in 0..shape.nz {
            for j in 0..shape.ny {
                for i in 0..shape.nx {
                    elements.push([
                        shape.node_index(i, j, k),
                        shape.node_index(i + 1, j, k),
                        shape.node_index(i + 1, j + 1, k),
                        shape.node_index(i, j + 1, k),
                        shape.node_index(i, j, k + 1),
                        shape.node_index(i + 1, j, k + 1),
                        shape.node_index(i + 1, j + 1, k + 1),
                        shape.node_index(i, j + 1, k + 1),
                    ]);
                }
            }
        }

        debug!(
            nx = shape.nx,
            ny = shape.ny,
            nz = shape.nz,
            nodes = nodes.len(),
            "built voxel lattice"
        );

        Ok(VoxelModel {
            shape,
            occupancy,
            nodes,
            elements,
        })
    }

    fn resolve(&self, resolution: Resolution) -> TopOptResult<(GridShape, f64)> {
        let longest = self.extent.max();
        if !(longest.is_finite() && longest > 0.0) || self.extent.min() <= 0.0 {
            return Err(TopOptError::invalid_mesh(format!(
                "voxelizer box has degenerate extent {:?}",
                self.extent
            )));
        }
        let pitch = match resolution {
            Resolution::Cells(nx, ny, nz) => {
                let n = nx.max(ny).max(nz);
                if n == 0 {
                    return Err(TopOptError::invalid_mesh("resolution has zero cells"));
                }
                longest / n as f64
            }
            Resolution::Pitch(p) => p,
        };
        if !(pitch.is_finite() && pitch > 0.0) {
            return Err(TopOptError::invalid_mesh(format!(
                "voxel pitch must be positive, got {}",
                pitch
            )));
        }
        let cells = |len: f64| ((len / pitch) - 1e-9).ceil().max(1.0) as usize;
        let shape = GridShape::new(
            cells(self.extent.x),
            cells(self.extent.y),
            cells(self.extent.z),
        );
        Ok((shape, pitch))
    }
}

impl Voxelizer for StructuredVoxelizer {
    type Solid = dyn Fn(&Point3<f64>) -> bool + Sync;

    fn voxelize(&self, solid: &Self::Solid, resolution: Resolution) -> TopOptResult<VoxelModel> {
        let (shape, pitch) = self.resolve(resolution)?;

        let mut occupancy = Vec::with_capacity(shape.num_cells());
        for cell in 0..shape.num_cells() {
            let (i, j, k) = shape.cell_coords(cell);
            let centre = Point3::new(
                self.origin.x + (i as f64 + 0.5) * pitch,
                self.origin.y + (j as f64 + 0.5) * pitch,
                self.origin.z + (k as f64 + 0.5) * pitch,
            );
            occupancy.push(if solid(&centre) { 1.0 } else { 0.0 });
        }

        if occupancy.iter().all(|&v| v == 0.0) {
            return Err(TopOptError::invalid_mesh("solid does not cover any voxel"));
        }

        Self::lattice(shape, occupancy, self.origin, pitch)
    }
}
