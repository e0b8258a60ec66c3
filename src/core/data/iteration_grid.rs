use thiserror::Error;

use crate::core::util::interleaved_rows::interleaved_rows;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum IterationGridError {
    #[error("grid dimensions {width}x{height} overflow the addressable cell count")]
    DimensionsOverflow { width: usize, height: usize },
}

/// One row of the grid handed to a worker for writing.
#[derive(Debug)]
pub struct Scanline<'a> {
    pub y: usize,
    pub cells: &'a mut [u32],
}

/// Row-major escape-time counts, `0` meaning the pixel did not escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationGrid {
    width: usize,
    height: usize,
    cells: Vec<u32>,
}

impl IterationGrid {
    pub fn new(width: usize, height: usize) -> Result<Self, IterationGridError> {
        let total_cells = width
            .checked_mul(height)
            .ok_or(IterationGridError::DimensionsOverflow { width, height })?;

        Ok(Self {
            width,
            height,
            cells: vec![0; total_cells],
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.height || col >= self.width {
            return None;
        }

        self.cells.get(row * self.width + col).copied()
    }

    #[must_use]
    pub fn row(&self, y: usize) -> Option<&[u32]> {
        if y >= self.height {
            return None;
        }

        let start = y * self.width;
        self.cells.get(start..start + self.width)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.cells
    }

    /// Contiguous mutable view used for whole-grid device transfers.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.cells
    }

    /// Splits the grid into disjoint scanline sets where set `i` holds rows
    /// `i, i + n, i + 2 * n, ...`. `n` is `worker_count` capped at the row
    /// count, so no set is empty unless the grid has no rows.
    pub fn interleaved_scanlines(&mut self, worker_count: usize) -> Vec<Vec<Scanline<'_>>> {
        let worker_count = worker_count.clamp(1, self.height.max(1));
        let mut assignments: Vec<Vec<Scanline<'_>>> = (0..worker_count)
            .map(|worker| Vec::with_capacity(interleaved_rows(worker, worker_count, self.height).len()))
            .collect();

        if self.width == 0 {
            return assignments;
        }

        for (y, cells) in self.cells.chunks_mut(self.width).enumerate() {
            assignments[y % worker_count].push(Scanline { y, cells });
        }

        assignments
    }
}
