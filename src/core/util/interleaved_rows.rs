use std::iter::StepBy;
use std::ops::Range;

/// Rows owned by worker `start_row` when `row_stride` workers share a grid of
/// `height` rows: `start_row, start_row + row_stride, ...`.
pub fn interleaved_rows(start_row: usize, row_stride: usize, height: usize) -> StepBy<Range<usize>> {
    (start_row.min(height)..height).step_by(row_stride.max(1))
}
