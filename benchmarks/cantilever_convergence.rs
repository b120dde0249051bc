/// Cantilever convergence benchmark
///
/// Runs the same cantilever problem with the direct and the conjugate
/// gradient strategy on a few grid sizes and compares compliance histories,
/// iteration counts and wall time. Both strategies solve the same reduced
/// system, so their histories should agree to solver tolerance.

use std::time::Instant;
use voxel_topopt::*;

fn run_case(nx: usize, ny: usize, nz: usize, strategy: SolverStrategy) -> TopOptResult<(OptimizationOutcome, f64)> {
    let config = OptimizationConfig {
        nelx: nx,
        nely: ny,
        nelz: nz,
        volfrac: 0.3,
        max_iter: 30,
        solver: strategy,
        ..Default::default()
    };

    let (mesh, occupancy) = StructuredVoxelizer::solid_box(nx, ny, nz, 1.0)?.into_parts()?;
    let load_case = LoadCase::cantilever(&mesh, 1.0)?;

    let start = Instant::now();
    let outcome = OptimizationDriver::new(config).run(&mesh, &occupancy, &load_case, |_| {})?;
    Ok((outcome, start.elapsed().as_secs_f64()))
}

fn main() -> TopOptResult<()> {
    println!("=== Cantilever Convergence: Direct vs Conjugate Gradient ===\n");

    let grids = vec![
        (8, 2, 4, "Coarse"),
        (16, 4, 8, "Medium"),
        (24, 6, 12, "Fine"),
    ];

    for (nx, ny, nz, label) in grids {
        println!("--- {} Grid ({} × {} × {}) ---", label, nx, ny, nz);

        let (direct, t_direct) = run_case(nx, ny, nz, SolverStrategy::Direct)?;
        let (cg, t_cg) = run_case(nx, ny, nz, SolverStrategy::ConjugateGradient)?;

        println!(
            "  Direct: {:?} after {} its, c = {:.6e}, {:.2} s",
            direct.state, direct.iterations, direct.compliance, t_direct
        );
        println!(
            "  CG:     {:?} after {} its, c = {:.6e}, {:.2} s",
            cg.state, cg.iterations, cg.compliance, t_cg
        );

        let max_rel_diff = direct
            .history
            .iter()
            .zip(cg.history.iter())
            .map(|(a, b)| ((a.compliance - b.compliance) / a.compliance).abs())
            .fold(0.0, f64::max);
        let density_diff = direct.density.max_abs_diff(&cg.density);

        println!("  Max relative compliance difference: {:.3e}", max_rel_diff);
        println!("  Max final density difference: {:.3e}", density_diff);

        if max_rel_diff < 1e-6 {
            println!("  ✓ PASS: strategies agree\n");
        } else {
            println!("  ✗ FAIL: strategies diverge\n");
        }
    }

    Ok(())
}
