/// Supports and loads for the static elasticity problem
///
/// A load case is part of the problem statement: which displacement DOFs are
/// held at zero and which nodes carry point forces.

use nalgebra::Point3;
use crate::error::{TopOptError, TopOptResult};
use crate::fem::dof::{DofManager, DOFS_PER_NODE};
use crate::mesh::HexMesh;

/// Relative tolerance for picking nodes on a bounding-box face
const FACE_TOL: f64 = 1e-9;

/// Face of the mesh bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl Face {
    fn axis(self) -> usize {
        match self {
            Face::XMin | Face::XMax => 0,
            Face::YMin | Face::YMax => 1,
            Face::ZMin | Face::ZMax => 2,
        }
    }

    fn is_max(self) -> bool {
        matches!(self, Face::XMax | Face::YMax | Face::ZMax)
    }
}

/// Concentrated nodal force
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLoad {
    pub node: usize,
    /// Displacement component: 0 = x, 1 = y, 2 = z
    pub axis: usize,
    pub magnitude: f64,
}

/// Fixed DOFs plus nodal point loads
#[derive(Debug, Clone, Default)]
pub struct LoadCase {
    fixed: Vec<usize>,
    loads: Vec<PointLoad>,
}

impl LoadCase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a single DOF at zero displacement
    pub fn fix_dof(&mut self, dof: usize) -> &mut Self {
        self.fixed.push(dof);
        self
    }

    /// Hold all three DOFs of a node
    pub fn fix_node(&mut self, node: usize) -> &mut Self {
        for axis in 0..DOFS_PER_NODE {
            self.fixed.push(DOFS_PER_NODE * node + axis);
        }
        self
    }

    /// Clamp every node lying on a face of the mesh bounding box
    ///
    /// # Returns
    /// Number of nodes fixed
    pub fn fix_face(&mut self, mesh: &HexMesh, face: Face) -> usize {
        let nodes = Self::nodes_on_face(mesh, face);
        for &node in &nodes {
            self.fix_node(node);
        }
        nodes.len()
    }

    /// Add a point force on one node
    pub fn add_point_load(&mut self, node: usize, axis: usize, magnitude: f64) -> &mut Self {
        self.loads.push(PointLoad {
            node,
            axis,
            magnitude,
        });
        self
    }

    /// Nodes whose coordinate matches the bounding-box extreme of `face`
    pub fn nodes_on_face(mesh: &HexMesh, face: Face) -> Vec<usize> {
        let Some((lo, hi)) = mesh.geometry.bounding_box() else {
            return Vec::new();
        };
        let axis = face.axis();
        let target = if face.is_max() { hi[axis] } else { lo[axis] };
        let tol = FACE_TOL * (hi - lo).norm().max(1.0);

        mesh.geometry
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[axis] - target).abs() <= tol)
            .map(|(i, _)| i)
            .collect()
    }

    /// Node closest to a point (first one wins on ties)
    pub fn nearest_node(mesh: &HexMesh, point: &Point3<f64>) -> Option<usize> {
        mesh.geometry
            .nodes
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p - point).norm_squared()))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    }

    /// Cantilever set-up: clamp the x-min face, push down (−z) on the x-max
    /// node nearest the centre of that face's bottom edge
    pub fn cantilever(mesh: &HexMesh, magnitude: f64) -> TopOptResult<Self> {
        let (lo, hi) = mesh
            .geometry
            .bounding_box()
            .ok_or_else(|| TopOptError::invalid_load_case("mesh has no nodes"))?;

        let mut case = Self::new();
        case.fix_face(mesh, Face::XMin);

        let tip = Point3::new(hi.x, 0.5 * (lo.y + hi.y), lo.z);
        let node = Self::nearest_node(mesh, &tip)
            .ok_or_else(|| TopOptError::invalid_load_case("no node near the load point"))?;
        case.add_point_load(node, 2, -magnitude);

        Ok(case)
    }

    /// Fixed DOFs, sorted and without duplicates
    pub fn fixed_dofs(&self) -> Vec<usize> {
        let mut fixed = self.fixed.clone();
        fixed.sort_unstable();
        fixed.dedup();
        fixed
    }

    pub fn loads(&self) -> &[PointLoad] {
        &self.loads
    }

    /// Check every referenced DOF exists and no load acts on a fixed DOF
    pub fn validate(&self, ndof: usize) -> TopOptResult<()> {
        if let Some(&dof) = self.fixed.iter().find(|&&d| d >= ndof) {
            return Err(TopOptError::invalid_load_case(format!(
                "fixed DOF {} out of range (ndof = {})",
                dof, ndof
            )));
        }

        let fixed = self.fixed_dofs();
        for load in &self.loads {
            if load.axis >= DOFS_PER_NODE {
                return Err(TopOptError::invalid_load_case(format!(
                    "load axis {} is not one of x, y, z",
                    load.axis
                )));
            }
            let dof = DOFS_PER_NODE * load.node + load.axis;
            if dof >= ndof {
                return Err(TopOptError::invalid_load_case(format!(
                    "load on node {} out of range (ndof = {})",
                    load.node, ndof
                )));
            }
            if !load.magnitude.is_finite() {
                return Err(TopOptError::invalid_load_case(format!(
                    "load on node {} has magnitude {}",
                    load.node, load.magnitude
                )));
            }
            if fixed.binary_search(&dof).is_ok() {
                return Err(TopOptError::invalid_load_case(format!(
                    "load on DOF {} which is fixed",
                    dof
                )));
            }
        }
        Ok(())
    }

    /// Global load vector F of length `ndof`
    pub fn load_vector(&self, ndof: usize) -> TopOptResult<Vec<f64>> {
        self.validate(ndof)?;

        let mut f = vec![0.0; ndof];
        for load in &self.loads {
            f[DOFS_PER_NODE * load.node + load.axis] += load.magnitude;
        }
        Ok(f)
    }

    /// DOF manager carrying this load case's supports
    pub fn dof_manager(&self, ndof: usize) -> TopOptResult<DofManager> {
        DofManager::with_fixed(ndof, &self.fixed_dofs())
    }
}
