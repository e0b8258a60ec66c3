use std::ops::Range;

use thiserror::Error;

use crate::core::data::run_parameters::Precision;

pub const BLOCK_WIDTH: usize = 16;
pub const BLOCK_HEIGHT: usize = 8;

const WORK_PER_CORE_CYCLE: u128 = 200;

/// Default device figures used when the adapter reports neither.
pub const DEFAULT_CLOCK_RATE_KHZ: u32 = 1_500_000;
pub const DEFAULT_CORES: u32 = 2048;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum BatchBudgetError {
    #[error("clock rate must be greater than zero")]
    ZeroClockRate,
    #[error("core count must be greater than zero")]
    ZeroCores,
}

/// Device throughput figures that bound how much work one dispatch may carry
/// before it risks the display driver's watchdog.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchBudget {
    clock_rate_khz: u32,
    cores: u32,
}

impl BatchBudget {
    pub fn new(clock_rate_khz: u32, cores: u32) -> Result<Self, BatchBudgetError> {
        if clock_rate_khz == 0 {
            return Err(BatchBudgetError::ZeroClockRate);
        }

        if cores == 0 {
            return Err(BatchBudgetError::ZeroCores);
        }

        Ok(Self {
            clock_rate_khz,
            cores,
        })
    }

    #[must_use]
    pub fn clock_rate_khz(&self) -> u32 {
        self.clock_rate_khz
    }

    #[must_use]
    pub fn cores(&self) -> u32 {
        self.cores
    }
}

impl Default for BatchBudget {
    fn default() -> Self {
        Self {
            clock_rate_khz: DEFAULT_CLOCK_RATE_KHZ,
            cores: DEFAULT_CORES,
        }
    }
}

fn precision_overhead(precision: Precision) -> u128 {
    match precision {
        Precision::Single => 1,
        Precision::Double => 32,
    }
}

/// `200 * clock_khz * cores / (overhead * max_iterations)`, saturating.
#[must_use]
pub fn max_pixels_per_batch(budget: BatchBudget, precision: Precision, max_iterations: u32) -> u64 {
    let work = WORK_PER_CORE_CYCLE * u128::from(budget.clock_rate_khz) * u128::from(budget.cores);
    let cost = precision_overhead(precision) * u128::from(max_iterations.max(1));

    u64::try_from(work / cost).unwrap_or(u64::MAX)
}

/// Rows per dispatch for a grid `width` pixels wide. Always a whole number of
/// block rows and never less than one.
#[must_use]
pub fn calculate_band_rows(
    width: usize,
    budget: BatchBudget,
    precision: Precision,
    max_iterations: u32,
) -> usize {
    let pixels = max_pixels_per_batch(budget, precision, max_iterations);
    let max_blocks = pixels.div_ceil((BLOCK_WIDTH * BLOCK_HEIGHT) as u64);
    let grid_x = width.div_ceil(BLOCK_WIDTH).max(1) as u64;
    let max_blocks_y = max_blocks.div_ceil(grid_x).max(1);

    usize::try_from(max_blocks_y)
        .unwrap_or(usize::MAX / BLOCK_HEIGHT)
        .saturating_mul(BLOCK_HEIGHT)
}

/// Consecutive row ranges of at most `band_rows` rows covering `0..height`.
pub fn row_bands(height: usize, band_rows: usize) -> impl Iterator<Item = Range<usize>> {
    let band_rows = band_rows.max(1);

    (0..height)
        .step_by(band_rows)
        .map(move |start| start..start.saturating_add(band_rows).min(height))
}
