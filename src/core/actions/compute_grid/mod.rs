pub mod coordinator;
pub mod errors;
pub mod ports;
pub(crate) mod run_control;
pub(crate) mod workers;
