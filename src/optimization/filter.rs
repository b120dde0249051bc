use sprs::{CsMat, TriMat};
use crate::error::{TopOptError, TopOptResult};
use crate::mesh::GridShape;

/// Density floor in the filter normalization
const FILTER_DENSITY_FLOOR: f64 = 1e-3;

/// Mesh-independent sensitivity filter over the voxel grid
///
/// Weights decay linearly with the distance between cell centres (grid
/// index units): `H_ef = max(0, rmin − dist(e, f))`. A radius of one cell or
/// less reaches no neighbour, so the filter reduces to the identity.
#[derive(Debug, Clone)]
pub struct SensitivityFilter {
    shape: GridShape,
    rmin: f64,
    /// `None` when the filter is the identity
    weights: Option<CsMat<f64>>,
    /// Row sums of `weights`
    weight_sums: Vec<f64>,
}

impl SensitivityFilter {
    pub fn new(shape: GridShape, rmin: f64) -> TopOptResult<Self> {
        if !(rmin.is_finite() && rmin >= 0.0) {
            return Err(TopOptError::invalid_config(format!(
                "rmin must be finite and non-negative, got {}",
                rmin
            )));
        }
        if rmin <= 1.0 {
            return Ok(Self {
                shape,
                rmin,
                weights: None,
                weight_sums: Vec::new(),
            });
        }

        let n = shape.num_cells();
        let reach = rmin.ceil() as usize - 1;
        let mut tri = TriMat::new((n, n));
        let mut weight_sums = vec![0.0; n];

        for (e, sum) in weight_sums.iter_mut().enumerate() {
            let (i, j, k) = shape.cell_coords(e);
            for kk in k.saturating_sub(reach)..=(k + reach).min(shape.nz - 1) {
                for jj in j.saturating_sub(reach)..=(j + reach).min(shape.ny - 1) {
                    for ii in i.saturating_sub(reach)..=(i + reach).min(shape.nx - 1) {
                        let di = ii as f64 - i as f64;
                        let dj = jj as f64 - j as f64;
                        let dk = kk as f64 - k as f64;
                        let w = rmin - (di * di + dj * dj + dk * dk).sqrt();
                        if w > 0.0 {
                            tri.add_triplet(e, shape.cell_index(ii, jj, kk), w);
                            *sum += w;
                        }
                    }
                }
            }
        }

        Ok(Self {
            shape,
            rmin,
            weights: Some(tri.to_csr()),
            weight_sums,
        })
    }

    pub fn rmin(&self) -> f64 {
        self.rmin
    }

    pub fn is_identity(&self) -> bool {
        self.weights.is_none()
    }

    /// Filtered sensitivities
    ///
    /// `dc̃_e = Σ_f H_ef ρ_f dc_f / (max(1e-3, ρ_e) Σ_f H_ef)`
    pub fn apply(&self, dc: &[f64], density: &[f64]) -> TopOptResult<Vec<f64>> {
        let n = self.shape.num_cells();
        if dc.len() != n || density.len() != n {
            return Err(TopOptError::numerical(format!(
                "filter expects {} cells, got {} sensitivities and {} densities",
                n,
                dc.len(),
                density.len()
            )));
        }

        let Some(h) = &self.weights else {
            return Ok(dc.to_vec());
        };

        let mut filtered = vec![0.0; n];
        for (e, row) in h.outer_iterator().enumerate() {
            let weighted: f64 = row.iter().map(|(f, &w)| w * density[f] * dc[f]).sum();
            filtered[e] = weighted / (density[e].max(FILTER_DENSITY_FLOOR) * self.weight_sums[e]);
        }
        Ok(filtered)
    }
}
