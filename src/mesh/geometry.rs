use nalgebra::{Point3, Vector3};
use super::grid::GridShape;
use super::topology::{Connectivity, HexElement};
use crate::error::{TopOptError, TopOptResult};

/// Relative tolerance when checking that every voxel has the same box shape
const CONGRUENCE_TOL: f64 = 1e-6;

/// Local node offsets of a Hex8 element in units of the element edge lengths
const HEX_CORNERS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Geometric information for the mesh
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Node coordinates
    pub nodes: Vec<Point3<f64>>,
}

impl Geometry {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Axis-aligned bounding box (min, max) of all nodes
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.nodes.first()?;
        let (mut lo, mut hi) = (first, first);
        for p in &self.nodes[1..] {
            for a in 0..3 {
                lo[a] = lo[a].min(p[a]);
                hi[a] = hi[a].max(p[a]);
            }
        }
        Some((lo, hi))
    }
}

/// Voxel mesh: node geometry, hexahedral connectivity and the density grid
/// layout the elements map onto
///
/// Every grid cell is owned by exactly one element, and all elements are
/// congruent axis-aligned boxes of size [`HexMesh::element_size`], so one
/// reference stiffness matrix serves the whole mesh.
#[derive(Debug, Clone)]
pub struct HexMesh {
    pub geometry: Geometry,
    pub connectivity: Connectivity,
    shape: GridShape,
    element_size: Vector3<f64>,
}

impl HexMesh {
    /// Build and validate a mesh from raw voxelizer output
    ///
    /// Element `e` must own cell `elements[e].cell`; the cell assignment has to
    /// be a bijection onto the grid, and each element has to sit where
    /// [`GridShape::cell_coords`] places its cell, counted from the bounding
    /// box minimum.
    pub fn new(
        shape: GridShape,
        nodes: Vec<Point3<f64>>,
        elements: Vec<HexElement>,
    ) -> TopOptResult<Self> {
        if shape.is_empty() || elements.is_empty() {
            return Err(TopOptError::invalid_mesh("mesh has no elements"));
        }
        if elements.len() != shape.num_cells() {
            return Err(TopOptError::invalid_mesh(format!(
                "{} elements for a grid of {} cells",
                elements.len(),
                shape.num_cells()
            )));
        }

        let mut owner = vec![None; shape.num_cells()];
        for (e, elem) in elements.iter().enumerate() {
            if elem.cell >= owner.len() {
                return Err(TopOptError::invalid_mesh(format!(
                    "element {} references cell {} outside the grid",
                    e, elem.cell
                )));
            }
            if let Some(prev) = owner[elem.cell].replace(e) {
                return Err(TopOptError::invalid_mesh(format!(
                    "cell {} is owned by elements {} and {}",
                    elem.cell, prev, e
                )));
            }
            if let Some(&bad) = elem.nodes.iter().find(|&&n| n >= nodes.len()) {
                return Err(TopOptError::invalid_mesh(format!(
                    "element {} references node {} but only {} nodes exist",
                    e,
                    bad,
                    nodes.len()
                )));
            }
            if elem.has_repeated_node() {
                return Err(TopOptError::invalid_mesh(format!(
                    "element {} repeats a node: {:?}",
                    e, elem.nodes
                )));
            }
        }

        let element_size = Self::measure_element(&nodes, &elements[0]);
        if element_size.iter().any(|&h| !(h.is_finite() && h > 0.0)) {
            return Err(TopOptError::invalid_mesh(format!(
                "element 0 has degenerate size {:?}",
                element_size
            )));
        }
        let geometry = Geometry { nodes };
        let origin = match geometry.bounding_box() {
            Some((lo, _)) => lo,
            None => return Err(TopOptError::invalid_mesh("mesh has no nodes")),
        };
        for (e, elem) in elements.iter().enumerate() {
            if !Self::is_congruent(&geometry.nodes, elem, &element_size) {
                return Err(TopOptError::invalid_mesh(format!(
                    "element {} is not an axis-aligned box of size {:?}",
                    e, element_size
                )));
            }
            let (i, j, k) = shape.cell_coords(elem.cell);
            let expected = origin
                + Vector3::new(
                    i as f64 * element_size.x,
                    j as f64 * element_size.y,
                    k as f64 * element_size.z,
                );
            let actual = geometry.nodes[elem.nodes[0]];
            if (actual - expected).amax() > CONGRUENCE_TOL * element_size.max() {
                return Err(TopOptError::invalid_mesh(format!(
                    "element {} owns cell {} at grid position ({}, {}, {}) but sits at {:?}",
                    e, elem.cell, i, j, k, actual.coords
                )));
            }
        }

        let mut connectivity = Connectivity::new();
        for elem in elements {
            connectivity.add_element(elem);
        }

        Ok(Self {
            geometry,
            connectivity,
            shape,
            element_size,
        })
    }

    /// Edge lengths of an element measured along its local 0-1, 0-3 and 0-4 edges
    fn measure_element(nodes: &[Point3<f64>], elem: &HexElement) -> Vector3<f64> {
        let p0 = nodes[elem.nodes[0]];
        Vector3::new(
            nodes[elem.nodes[1]].x - p0.x,
            nodes[elem.nodes[3]].y - p0.y,
            nodes[elem.nodes[4]].z - p0.z,
        )
    }

    fn is_congruent(nodes: &[Point3<f64>], elem: &HexElement, size: &Vector3<f64>) -> bool {
        let p0 = nodes[elem.nodes[0]];
        let scale = size.max();
        elem.nodes.iter().zip(HEX_CORNERS.iter()).all(|(&n, corner)| {
            let expected = Vector3::new(
                corner[0] * size.x,
                corner[1] * size.y,
                corner[2] * size.z,
            );
            ((nodes[n] - p0) - expected).amax() <= CONGRUENCE_TOL * scale
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Edge lengths (hx, hy, hz) shared by every element
    pub fn element_size(&self) -> Vector3<f64> {
        self.element_size
    }

    pub fn elements(&self) -> &[HexElement] {
        &self.connectivity.hex_elements
    }

    pub fn num_nodes(&self) -> usize {
        self.geometry.num_nodes()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.num_elements()
    }

    /// Three displacement DOFs per node
    pub fn num_dofs(&self) -> usize {
        3 * self.num_nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> (Vec<Point3<f64>>, HexElement) {
        let nodes = HEX_CORNERS
            .iter()
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        (nodes, HexElement::new([0, 1, 2, 3, 4, 5, 6, 7], 0))
    }

    #[test]
    fn test_single_element_mesh() {
        let (nodes, elem) = unit_cube();
        let mesh = HexMesh::new(GridShape::new(1, 1, 1), nodes, vec![elem]).unwrap();
        assert_eq!(mesh.num_nodes(), 8);
        assert_eq!(mesh.num_dofs(), 24);
        assert_eq!(mesh.element_size(), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_rejects_empty_mesh() {
        let err = HexMesh::new(GridShape::new(1, 1, 1), Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, TopOptError::InvalidMesh(_)));
    }

    #[test]
    fn test_rejects_out_of_range_node() {
        let (nodes, mut elem) = unit_cube();
        elem.nodes[7] = 42;
        let err = HexMesh::new(GridShape::new(1, 1, 1), nodes, vec![elem]).unwrap_err();
        assert!(format!("{err}").contains("node 42"));
    }

    #[test]
    fn test_rejects_cell_mismatch() {
        let (nodes, mut elem) = unit_cube();
        elem.cell = 3;
        assert!(HexMesh::new(GridShape::new(1, 1, 1), nodes, vec![elem]).is_err());
    }

    #[test]
    fn test_rejects_twisted_element() {
        let (nodes, mut elem) = unit_cube();
        elem.nodes.swap(6, 7);
        let err = HexMesh::new(GridShape::new(1, 1, 1), nodes, vec![elem]).unwrap_err();
        assert!(format!("{err}").contains("axis-aligned"));
    }

    /// 3x2x1 lattice with x-fastest nodes; `cell_of(i, j)` picks the cell numbering
    fn strip(cell_of: impl Fn(usize, usize) -> usize) -> (Vec<Point3<f64>>, Vec<HexElement>) {
        let shape = GridShape::new(3, 2, 1);
        let mut nodes = Vec::new();
        for k in 0..=1 {
            for j in 0..=2 {
                for i in 0..=3 {
                    nodes.push(Point3::new(i as f64, j as f64, k as f64));
                }
            }
        }
        let mut elements = Vec::new();
        for j in 0..2 {
            for i in 0..3 {
                let n = |di: usize, dj: usize, dk: usize| shape.node_index(i + di, j + dj, dk);
                elements.push(HexElement::new(
                    [
                        n(0, 0, 0),
                        n(1, 0, 0),
                        n(1, 1, 0),
                        n(0, 1, 0),
                        n(0, 0, 1),
                        n(1, 0, 1),
                        n(1, 1, 1),
                        n(0, 1, 1),
                    ],
                    cell_of(i, j),
                ));
            }
        }
        (nodes, elements)
    }

    #[test]
    fn test_accepts_x_fastest_cells() {
        let shape = GridShape::new(3, 2, 1);
        let (nodes, elements) = strip(|i, j| shape.cell_index(i, j, 0));
        let mesh = HexMesh::new(shape, nodes, elements).unwrap();
        assert_eq!(mesh.num_elements(), 6);
    }

    #[test]
    fn test_rejects_y_fastest_cells() {
        // Still a bijection onto the grid, but cell 1 lands at (0, 1) instead of (1, 0)
        let (nodes, elements) = strip(|i, j| j + 2 * i);
        let err = HexMesh::new(GridShape::new(3, 2, 1), nodes, elements).unwrap_err();
        assert!(matches!(err, TopOptError::InvalidMesh(ref msg) if msg.contains("grid position")));
    }

    #[test]
    fn test_offset_origin_is_accepted() {
        let (nodes, elem) = unit_cube();
        let shifted = nodes.iter().map(|p| p + Vector3::new(-2.0, 5.0, 0.5)).collect();
        assert!(HexMesh::new(GridShape::new(1, 1, 1), shifted, vec![elem]).is_ok());
    }

    #[test]
    fn test_bounding_box() {
        let (nodes, _) = unit_cube();
        let geom = Geometry { nodes };
        let (lo, hi) = geom.bounding_box().unwrap();
        assert_eq!(lo, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(hi, Point3::new(1.0, 1.0, 1.0));
    }
}
