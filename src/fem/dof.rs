use crate::error::{TopOptError, TopOptResult};
use crate::mesh::HexElement;

/// Displacement components per node (x, y, z)
pub const DOFS_PER_NODE: usize = 3;

/// Degree of Freedom (DOF) manager
///
/// Numbers displacement DOFs node-major (`3 * node + axis`) and tracks which
/// DOFs carry a prescribed (Dirichlet) displacement.
#[derive(Debug, Clone)]
pub struct DofManager {
    /// Number of nodes in the mesh
    num_nodes: usize,

    /// Total number of DOFs
    total_dofs: usize,

    /// Dirichlet flag per DOF
    constrained: Vec<bool>,

    /// Prescribed values for Dirichlet DOFs
    dirichlet_values: Vec<f64>,

    /// Number of Dirichlet DOFs
    num_constrained: usize,
}

impl DofManager {
    /// Create a DOF manager with three displacement DOFs per node
    pub fn new(num_nodes: usize) -> Self {
        let total_dofs = num_nodes * DOFS_PER_NODE;

        Self {
            num_nodes,
            total_dofs,
            constrained: vec![false; total_dofs],
            dirichlet_values: vec![0.0; total_dofs],
            num_constrained: 0,
        }
    }

    /// DOF manager for `total_dofs` unknowns with the given DOFs fixed at zero
    pub fn with_fixed(total_dofs: usize, fixed: &[usize]) -> TopOptResult<Self> {
        let mut dof_mgr = Self {
            num_nodes: total_dofs / DOFS_PER_NODE,
            total_dofs,
            constrained: vec![false; total_dofs],
            dirichlet_values: vec![0.0; total_dofs],
            num_constrained: 0,
        };
        for &dof in fixed {
            dof_mgr.set_dirichlet(dof, 0.0)?;
        }
        Ok(dof_mgr)
    }

    /// Global DOF index for a node and displacement component
    pub fn global_dof(&self, node_id: usize, axis: usize) -> usize {
        debug_assert!(node_id < self.num_nodes);
        debug_assert!(axis < DOFS_PER_NODE);
        node_id * DOFS_PER_NODE + axis
    }

    /// The 24 global DOFs of an element, in local node order with x, y, z per node
    pub fn element_dofs(elem: &HexElement) -> [usize; 24] {
        let mut dofs = [0; 24];
        for (local, &node) in elem.nodes.iter().enumerate() {
            for axis in 0..DOFS_PER_NODE {
                dofs[DOFS_PER_NODE * local + axis] = DOFS_PER_NODE * node + axis;
            }
        }
        dofs
    }

    /// Apply Dirichlet boundary condition to a DOF
    ///
    /// # Arguments
    /// * `dof` - Global DOF index
    /// * `value` - Prescribed displacement
    pub fn set_dirichlet(&mut self, dof: usize, value: f64) -> TopOptResult<()> {
        if dof >= self.total_dofs {
            return Err(TopOptError::invalid_load_case(format!(
                "fixed DOF {} out of range (ndof = {})",
                dof, self.total_dofs
            )));
        }
        if !value.is_finite() {
            return Err(TopOptError::invalid_load_case(format!(
                "prescribed displacement of DOF {} is {}",
                dof, value
            )));
        }

        if !self.constrained[dof] {
            self.constrained[dof] = true;
            self.num_constrained += 1;
        }
        self.dirichlet_values[dof] = value;
        Ok(())
    }

    /// Apply Dirichlet BC to all three DOFs of a node
    pub fn set_dirichlet_node(&mut self, node_id: usize, value: f64) -> TopOptResult<()> {
        for axis in 0..DOFS_PER_NODE {
            self.set_dirichlet(node_id * DOFS_PER_NODE + axis, value)?;
        }
        Ok(())
    }

    /// Check if a DOF has Dirichlet BC
    pub fn is_dirichlet(&self, dof: usize) -> bool {
        self.constrained[dof]
    }

    /// Get the Dirichlet value for a DOF
    pub fn get_dirichlet_value(&self, dof: usize) -> f64 {
        self.dirichlet_values[dof]
    }

    /// Get total number of DOFs
    pub fn total_dofs(&self) -> usize {
        self.total_dofs
    }

    /// Get number of free DOFs (not constrained by Dirichlet BC)
    pub fn num_free_dofs(&self) -> usize {
        self.total_dofs - self.num_constrained
    }

    /// Get number of constrained DOFs
    pub fn num_constrained_dofs(&self) -> usize {
        self.num_constrained
    }

    /// Get number of nodes
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Free DOFs in ascending order
    pub fn free_dofs(&self) -> Vec<usize> {
        (0..self.total_dofs).filter(|&d| !self.constrained[d]).collect()
    }

    /// Constrained DOFs in ascending order
    pub fn constrained_dofs(&self) -> Vec<usize> {
        (0..self.total_dofs).filter(|&d| self.constrained[d]).collect()
    }

    /// Map from global DOF to its position among the free DOFs
    pub fn reduced_index_map(&self) -> Vec<Option<usize>> {
        let mut next = 0;
        self.constrained
            .iter()
            .map(|&c| {
                if c {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect()
    }
}
