pub mod args;
pub mod summary;

use std::error::Error;
use std::time::Instant;

use tracing::info;

use crate::controllers::cli::args::CliArgs;
use crate::controllers::cli::summary::GridSummary;
use crate::core::actions::compute_grid::coordinator::{ComputeCoordinator, CoordinatorConfig};
use crate::core::data::run_parameters::{Backend, RunParameters};
use crate::core::data::viewport::Viewport;

pub fn run_cli(args: CliArgs) -> Result<(), Box<dyn Error>> {
    let mut parameters = RunParameters::default();
    parameters.set_max_iterations(args.max_iterations)?;
    parameters.set_precision(args.precision.into());
    if let Some(threads) = args.threads {
        parameters.set_thread_count(threads)?;
    }

    let config = CoordinatorConfig {
        viewport: Viewport::new(args.offset_x, args.offset_y, args.zoom)?,
        parameters,
        probe_gpu: !args.no_gpu && cfg!(feature = "gpu"),
        ..CoordinatorConfig::default()
    };

    let coordinator = ComputeCoordinator::with_config(args.width, args.height, config)?;
    let capabilities = coordinator.capabilities();

    let backend = args
        .backend
        .map(Backend::from)
        .unwrap_or_else(|| capabilities.preferred_cpu_backend());
    coordinator.set_backend(backend)?;

    println!(
        "Capabilities: simd128={} simd256={} gpu={}",
        capabilities.simd128,
        capabilities.simd256,
        capabilities
            .gpu
            .as_ref()
            .map_or_else(|| "none".to_string(), |gpu| format!("{} (f64: {})", gpu.name, gpu.supports_f64)),
    );

    let parameters = coordinator.parameters();
    println!("Grid: {}x{}", args.width, args.height);
    println!(
        "Backend: {} / {} precision, {} worker(s), max iterations {}",
        parameters.backend(),
        parameters.precision(),
        parameters.worker_count(),
        parameters.max_iterations()
    );

    for run in 1..=args.repeat.max(1) {
        let start = Instant::now();
        let outcome = coordinator.compute()?;
        let elapsed = start.elapsed();

        info!(run, ?outcome, ?elapsed, "run timed");
        println!("Run {run}: {elapsed:?} ({outcome:?})");
    }

    println!("{}", GridSummary::of(&coordinator.grid()));

    Ok(())
}
