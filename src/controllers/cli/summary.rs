use std::fmt;

use crate::core::data::iteration_grid::IterationGrid;

/// Cell counts reported after a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridSummary {
    pub interior: usize,
    pub escaped: usize,
    pub max_escape: u32,
}

impl GridSummary {
    #[must_use]
    pub fn of(grid: &IterationGrid) -> Self {
        let interior = grid.as_slice().iter().filter(|&&cell| cell == 0).count();

        Self {
            interior,
            escaped: grid.len() - interior,
            max_escape: grid.as_slice().iter().copied().max().unwrap_or(0),
        }
    }
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interior: {}, escaped: {}, slowest escape: {}",
            self.interior, self.escaped, self.max_escape
        )
    }
}
