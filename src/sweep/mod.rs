//! The model fitting engine and its run configuration.

pub mod config;
pub mod engine;

pub use config::{parse_factors, SweepConfig};
pub use engine::{run_sweep, working_model, SweepEngine, SweepInputs, FOLLOWUP};
