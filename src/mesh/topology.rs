/// An 8-node trilinear hexahedral element (Hex8)
///
/// Node numbering (local coordinates ξ, η, ζ in [-1, 1]):
/// Bottom face (ζ = -1), counter-clockwise seen from +z:
///   0: (-1,-1,-1)  1: (+1,-1,-1)  2: (+1,+1,-1)  3: (-1,+1,-1)
/// Top face (ζ = +1):
///   4: (-1,-1,+1)  5: (+1,-1,+1)  6: (+1,+1,+1)  7: (-1,+1,+1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexElement {
    /// Global node indices for this element (8 nodes)
    pub nodes: [usize; 8],
    /// Linear index of the density cell this element belongs to
    pub cell: usize,
}

impl HexElement {
    pub fn new(nodes: [usize; 8], cell: usize) -> Self {
        Self { nodes, cell }
    }

    /// True if some global node appears twice in this element
    pub fn has_repeated_node(&self) -> bool {
        (0..8).any(|a| (a + 1..8).any(|b| self.nodes[a] == self.nodes[b]))
    }
}

/// Connectivity information for the mesh
#[derive(Debug, Clone)]
pub struct Connectivity {
    pub hex_elements: Vec<HexElement>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self {
            hex_elements: Vec::new(),
        }
    }

    pub fn add_element(&mut self, element: HexElement) {
        self.hex_elements.push(element);
    }

    pub fn num_elements(&self) -> usize {
        self.hex_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hex_elements.is_empty()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
