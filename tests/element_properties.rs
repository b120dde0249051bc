use approx::assert_relative_eq;
use voxel_topopt::{
    Assembler, DensityGrid, ElementFormulator, LinearSolver, MaterialModel, StructuredVoxelizer,
    TopOptError,
};

#[test]
fn test_element_stiffness_symmetric_and_psd() {
    for &(e, nu) in &[(1.0, 0.3), (210e9, 0.29), (0.5, 0.05), (3.0, 0.49)] {
        let ke = ElementFormulator::stiffness(e, nu).unwrap();

        let scale = ke.amax();
        for i in 0..24 {
            for j in 0..24 {
                assert_relative_eq!(ke[(i, j)], ke[(j, i)], epsilon = 1e-12 * scale);
            }
        }

        let eigen = ke.symmetric_eigen();
        let mut values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
        values.sort_by(|a, b| a.total_cmp(b));
        for &lambda in &values {
            assert!(lambda >= -1e-10 * scale, "E = {}, ν = {}: eigenvalue {}", e, nu, lambda);
        }
        // Six rigid body modes, everything else strictly positive
        assert!(values[5].abs() < 1e-10 * scale);
        assert!(values[6] > 1e-6 * scale);
    }
}

#[test]
fn test_uniform_density_scales_by_rho_to_the_p() {
    let (mesh, solid) = StructuredVoxelizer::solid_box(3, 2, 2, 1.0)
        .unwrap()
        .into_parts()
        .unwrap();
    let material = MaterialModel::simp(1.0, 0.3).unwrap();
    let ke = ElementFormulator::stiffness(1.0, 0.3).unwrap();
    let k_solid = Assembler::assemble(&mesh, &solid, &ke, &material, 3.0, true).unwrap();

    for &(rho, penal) in &[(0.5, 3.0), (0.2, 1.0), (0.9, 4.5)] {
        let density = DensityGrid::uniform(mesh.shape(), rho);
        let k = Assembler::assemble(&mesh, &density, &ke, &material, penal, true).unwrap();
        let factor: f64 = rho.powf(penal);

        assert_eq!(k.nnz(), k_solid.nnz());
        for (&v, (r, c)) in k.iter() {
            let reference = *k_solid.get(r, c).unwrap();
            assert_relative_eq!(v, factor * reference, epsilon = 1e-14, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_density_floor_keeps_diagonal_positive() {
    let (mesh, _) = StructuredVoxelizer::solid_box(1, 1, 1, 1.0)
        .unwrap()
        .into_parts()
        .unwrap();
    let material = MaterialModel::simp(1.0, 0.3).unwrap();
    let ke = ElementFormulator::stiffness(1.0, 0.3).unwrap();
    let density = DensityGrid::uniform(mesh.shape(), 1e-3);

    let k = Assembler::assemble(&mesh, &density, &ke, &material, 5.0, false).unwrap();
    for d in 0..mesh.num_dofs() {
        let diag = *k.get(d, d).unwrap();
        assert!(diag > 0.0);
        assert!(diag < 1e-12);
    }
}

#[test]
fn test_unsupported_system_is_singular() {
    let (mesh, density) = StructuredVoxelizer::solid_box(2, 1, 1, 1.0)
        .unwrap()
        .into_parts()
        .unwrap();
    let material = MaterialModel::simp(1.0, 0.3).unwrap();
    let ke = ElementFormulator::stiffness(1.0, 0.3).unwrap();
    let k = Assembler::assemble(&mesh, &density, &ke, &material, 3.0, false).unwrap();

    let mut f = vec![0.0; mesh.num_dofs()];
    f[5] = 1.0;
    let err = LinearSolver::default().solve(&k, &f, &[]).unwrap_err();
    match err {
        TopOptError::SingularSystem { free, fixed, .. } => {
            assert_eq!(free, mesh.num_dofs());
            assert_eq!(fixed, 0);
        }
        other => panic!("expected a singular system, got {other}"),
    }
}

#[test]
fn test_invalid_material_rejected() {
    assert!(matches!(
        ElementFormulator::stiffness(-1.0, 0.3),
        Err(TopOptError::InvalidMaterial(_))
    ));
    assert!(matches!(
        ElementFormulator::stiffness(1.0, 0.5),
        Err(TopOptError::InvalidMaterial(_))
    ));
}
