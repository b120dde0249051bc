use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use voxel_topopt::{
    LoadCase, OptimizationConfig, OptimizationDriver, StructuredVoxelizer, TopOptResult,
};

/// Cantilever compliance minimization on a solid voxel block
///
/// Usage: cantilever_demo [config.toml]
///
/// The x-min face is clamped and a unit load pushes down on the middle of the
/// x-max bottom edge. Set `RUST_LOG=debug` for solver statistics.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> TopOptResult<()> {
    println!("=== Cantilever Topology Optimization Demo ===\n");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading configuration from {}", path);
            OptimizationConfig::from_file(path)?
        }
        None => OptimizationConfig {
            nelx: 24,
            nely: 8,
            nelz: 12,
            max_iter: 60,
            ..Default::default()
        },
    };
    config.log_summary();

    // Generate voxel mesh
    let model = StructuredVoxelizer::solid_box(config.nelx, config.nely, config.nelz, 1.0)?;
    let (mesh, occupancy) = model.into_parts()?;
    println!("  Nodes: {}", mesh.num_nodes());
    println!("  Elements: {}", mesh.num_elements());
    println!("  DOFs: {}", mesh.num_dofs());

    let load_case = LoadCase::cantilever(&mesh, 1.0)?;
    println!("  Fixed DOFs: {}", load_case.fixed_dofs().len());

    println!("\nOptimizing...");
    let driver = OptimizationDriver::new(config);
    let outcome = driver.run(&mesh, &occupancy, &load_case, |progress| {
        if progress.iteration % 10 == 0 {
            println!(
                "  it {:4}  c = {:12.5e}  vol = {:.4}  change = {:.4}",
                progress.iteration, progress.compliance, progress.volume_fraction, progress.change
            );
        }
    })?;

    println!("\n=== Result ===");
    println!("  State: {:?}", outcome.state);
    println!("  Iterations: {}", outcome.iterations);
    println!("  Compliance: {:.5e}", outcome.compliance);
    println!("  Volume fraction: {:.4}", outcome.density.volume_fraction());

    // Mid-plane section through the thresholded design, top row first
    let shape = outcome.density.shape();
    let solid = outcome.density.threshold(0.5);
    let j = shape.ny / 2;
    println!("\nSection y = {} ('#' solid):", j);
    for k in (0..shape.nz).rev() {
        let row: String = (0..shape.nx)
            .map(|i| if solid[shape.cell_index(i, j, k)] > 0.0 { '#' } else { '.' })
            .collect();
        println!("  {}", row);
    }

    Ok(())
}
