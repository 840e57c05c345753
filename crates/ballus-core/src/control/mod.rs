//! Control systems for the table
//!
//! Provides the PID controller and the per-axis wiring that runs one
//! controller for each of X, Y and Z.

mod pid;
mod table;

pub use pid::{Pid, PidConfig, PidPhase, PidState, DEFAULT_OUTPUT_LIMIT};
pub use table::{Axis, TableControllers, TableTuning};
