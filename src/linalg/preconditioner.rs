use sprs::CsMat;

/// Preconditioner trait for iterative solvers
///
/// Solves M z = r approximately (where M ≈ A)
pub trait Preconditioner {
    /// Apply preconditioner: solve M z = r
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// Jacobi (diagonal) preconditioner
///
/// M = diag(A)
/// Cheap, and effective for the badly scaled diagonals SIMP produces
/// (solid and void stiffness differ by the penalized density contrast)
pub struct JacobiPreconditioner {
    /// Inverse of diagonal entries: 1/A_ii
    diag_inv: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Create Jacobi preconditioner from matrix A
    #[allow(non_snake_case)]
    pub fn new(A: &CsMat<f64>) -> Self {
        let n = A.rows();
        let mut diag_inv = vec![1.0; n];

        for (i, d) in diag_inv.iter_mut().enumerate() {
            if let Some(&val) = A.get(i, i) {
                if val.abs() > 1e-300 {
                    *d = 1.0 / val;
                }
            }
        }

        Self { diag_inv }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        // z = D^{-1} r
        r.iter()
            .zip(self.diag_inv.iter())
            .map(|(&ri, &di)| ri * di)
            .collect()
    }
}

/// Identity preconditioner (no preconditioning)
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.to_vec()
    }
}
