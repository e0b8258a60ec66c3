pub mod capabilities;
pub mod complex;
pub mod iteration_grid;
pub mod real;
pub mod run_parameters;
pub mod viewport;
