use std::sync::Arc;
use std::thread;
use std::time::Duration;

use escape_grid::{
    Backend, ComputeCoordinator, ComputeError, CoordinatorConfig, IterationGrid, Precision,
    RunOutcome, RunParameters, Viewport, escape_time,
};

const CPU_BACKENDS: [Backend; 3] = [Backend::Scalar, Backend::Simd128, Backend::Simd256];
const PRECISIONS: [Precision; 2] = [Precision::Single, Precision::Double];

fn coordinator_for(
    width: usize,
    height: usize,
    viewport: Viewport,
    parameters: RunParameters,
    probe_gpu: bool,
) -> Option<ComputeCoordinator> {
    ComputeCoordinator::with_config(
        width,
        height,
        CoordinatorConfig {
            viewport,
            parameters,
            probe_gpu,
            ..CoordinatorConfig::default()
        },
    )
    .ok()
}

/// Grid from one run, or `None` when the backend is unsupported here.
fn compute(
    width: usize,
    height: usize,
    viewport: Viewport,
    parameters: RunParameters,
) -> Option<IterationGrid> {
    let coordinator = coordinator_for(width, height, viewport, parameters, false)?;

    assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
    Some(coordinator.snapshot())
}

fn params(max_iterations: u32, precision: Precision, backend: Backend, threads: usize) -> RunParameters {
    RunParameters::new(max_iterations, precision, backend, threads).unwrap()
}

fn viewports() -> Vec<Viewport> {
    vec![
        Viewport::default(),
        Viewport::new(-0.7453, 0.1127, 200.0).unwrap(),
        Viewport::new(-0.16, 1.0405, 40.0).unwrap(),
        Viewport::new(-1.4, 0.0, 25.0).unwrap(),
    ]
}

// Inside the main cardioid with multiplier below 0.95, or well inside the
// period-2 bulb.
fn deep_interior(real: f64, imag: f64) -> bool {
    let (a, b) = (1.0 - 4.0 * real, -4.0 * imag);
    let r = (a * a + b * b).sqrt();
    let sqrt_real = ((r + a) / 2.0).sqrt();
    let sqrt_imag = ((r - a) / 2.0).sqrt().copysign(b);
    let multiplier = ((1.0 - sqrt_real).powi(2) + sqrt_imag.powi(2)).sqrt();

    multiplier < 0.95 || (real + 1.0).powi(2) + imag * imag < 0.2 * 0.2
}

#[test]
fn cpu_backends_agree_exactly_at_equal_precision() {
    for precision in PRECISIONS {
        for viewport in viewports() {
            for width in [37, 64, 101] {
                let expected = compute(width, 29, viewport, params(400, precision, Backend::Scalar, 1)).unwrap();

                for backend in CPU_BACKENDS {
                    for threads in [1, 3, 8] {
                        let Some(grid) = compute(width, 29, viewport, params(400, precision, backend, threads)) else {
                            continue;
                        };

                        assert_eq!(
                            grid, expected,
                            "{backend} {precision} width {width} threads {threads} at {viewport:?}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn four_by_four_reference_cells() {
    let viewport = Viewport::new(0.0, 0.0, 1.0).unwrap();

    for backend in CPU_BACKENDS {
        let Some(grid) = compute(4, 4, viewport, params(50, Precision::Double, backend, 2)) else {
            continue;
        };

        // (0, 0) -> -1 - 1i, (3, 3) -> 0.5 + 0.5i
        assert_eq!(grid.get(0, 0), Some(3), "{backend}");
        assert_eq!(grid.get(3, 3), Some(5), "{backend}");
    }
}

#[test]
fn immediate_divergence_reports_one_on_every_backend() {
    // Pixel (0, 0) maps to 2 + 2i.
    let viewport = Viewport::new(3.0, 3.0, 1.0).unwrap();

    for precision in PRECISIONS {
        for backend in CPU_BACKENDS {
            for max_iterations in [1, 2, 1001] {
                let Some(grid) = compute(8, 8, viewport, params(max_iterations, precision, backend, 3)) else {
                    continue;
                };

                assert_eq!(grid.get(0, 0), Some(1), "{backend} {precision} max {max_iterations}");
            }
        }
    }
}

#[test]
fn interior_with_single_iteration_is_zero_everywhere() {
    let interior = Viewport::new(-0.1, 0.05, 20.0).unwrap();

    for precision in PRECISIONS {
        for backend in CPU_BACKENDS {
            let Some(grid) = compute(19, 7, interior, params(1, precision, backend, 2)) else {
                continue;
            };

            assert!(grid.as_slice().iter().all(|&cell| cell == 0), "{backend} {precision}");
        }
    }
}

#[test]
fn cardioid_and_bulb_never_escape() {
    let viewport = Viewport::default();
    let probe = coordinator_for(96, 64, viewport, RunParameters::default(), false).unwrap();

    for precision in PRECISIONS {
        for backend in CPU_BACKENDS {
            for max_iterations in [1, 17, 500] {
                let Some(grid) = compute(96, 64, viewport, params(max_iterations, precision, backend, 4)) else {
                    continue;
                };

                for row in 0..64 {
                    for col in 0..96 {
                        let c = probe.map_pixel(col, row);

                        if deep_interior(c.real, c.imag) {
                            assert_eq!(grid.get(row, col), Some(0), "{backend} {precision} at {c:?}");
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn values_stay_within_the_iteration_cap() {
    for backend in CPU_BACKENDS {
        let Some(grid) = compute(50, 40, Viewport::new(-0.7453, 0.1127, 200.0).unwrap(), params(64, Precision::Double, backend, 3)) else {
            continue;
        };

        assert!(grid.as_slice().iter().all(|&cell| cell <= 64));
    }
}

#[test]
fn resize_between_runs_writes_every_cell() {
    // Every pixel escapes on the first check, so a zero cell was never written.
    let far = Viewport::new(20.0, 20.0, 1.0).unwrap();
    let coordinator = coordinator_for(16, 16, far, params(10, Precision::Double, Backend::Simd128, 4), false).unwrap();

    coordinator.compute().unwrap();

    for (width, height) in [(33, 7), (5, 41), (128, 1)] {
        coordinator.resize(width, height).unwrap();
        coordinator.compute().unwrap();

        let grid = coordinator.grid();
        assert_eq!((grid.width(), grid.height()), (width, height));
        assert!(grid.as_slice().iter().all(|&cell| cell == 1));
    }
}

#[test]
fn aborted_run_leaves_only_valid_cells() {
    let coordinator = Arc::new(
        coordinator_for(64, 4000, Viewport::default(), params(5000, Precision::Double, Backend::Simd128, 2), false)
            .unwrap(),
    );

    let runner = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.compute())
    };

    while !coordinator.is_running() {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(20));
    coordinator.request_abort();

    let outcome = runner.join().unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Aborted | RunOutcome::Completed));

    let grid = coordinator.snapshot();
    for row in 0..grid.height() {
        for col in 0..grid.width() {
            let cell = grid.get(row, col).unwrap();

            if cell != 0 {
                assert_eq!(cell, escape_time(coordinator.map_pixel(col, row), 5000));
            }
        }
    }

    coordinator.reset_abort();
    assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
}

#[test]
fn failed_run_reports_every_worker_and_recovers() {
    let overflowing = Viewport::new(0.0, -1.0e39, 1.0).unwrap();
    let coordinator =
        coordinator_for(12, 12, overflowing, params(10, Precision::Single, Backend::Simd128, 4), false).unwrap();

    match coordinator.compute() {
        Err(ComputeError::WorkersFailed(aggregate)) => {
            assert_eq!(aggregate.workers(), vec![0, 1, 2, 3]);
            assert_eq!(aggregate.len(), 4);
        }
        other => panic!("expected an aggregate failure, got {other:?}"),
    }

    coordinator.set_viewport(Viewport::default());
    assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
}

#[test]
#[ignore = "requires a compatible GPU adapter"]
fn gpu_single_precision_matches_cpu() {
    let viewport = Viewport::new(-0.7453, 0.1127, 200.0).unwrap();
    let gpu_params = params(500, Precision::Single, Backend::Gpu, 1);
    let coordinator = coordinator_for(203, 117, viewport, gpu_params, true)
        .expect("no GPU adapter available");

    assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));

    let expected = compute(203, 117, viewport, params(500, Precision::Single, Backend::Scalar, 4)).unwrap();
    let gpu = coordinator.snapshot();
    let mismatches = gpu
        .as_slice()
        .iter()
        .zip(expected.as_slice())
        .filter(|(gpu, cpu)| gpu != cpu)
        .count();

    // Device compilers may fuse multiply-adds, so allow a sliver of boundary pixels.
    assert!(mismatches * 1000 <= gpu.len(), "{mismatches} mismatching cells");
    assert_eq!(gpu.get(0, 0), expected.get(0, 0));
}

#[test]
#[ignore = "requires a compatible GPU adapter"]
fn gpu_batches_and_aborts_between_bands() {
    let gpu_params = params(2000, Precision::Single, Backend::Gpu, 1);
    let coordinator = coordinator_for(64, 64, Viewport::new(3.0, 3.0, 1.0).unwrap(), gpu_params, true)
        .expect("no GPU adapter available");

    assert_eq!(coordinator.compute(), Ok(RunOutcome::Completed));
    assert_eq!(coordinator.grid().get(0, 0), Some(1));

    coordinator.request_abort();
    coordinator.resize(64, 64).unwrap();
    assert_eq!(coordinator.compute(), Ok(RunOutcome::Aborted));
    assert!(coordinator.grid().as_slice().iter().all(|&cell| cell == 0));
}
