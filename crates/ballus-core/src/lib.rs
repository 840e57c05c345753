//! ballus-core: control core for a ball-balancing table
//!
//! The table is driven by two feedback loops: a coupled X-Y positioning loop
//! and an independent Z loop. Both are built from the same discrete-time PID
//! controller with output filtering, output saturation and anti-windup.
//!
//! # Modules
//!
//! - [`control`] - PID controller and the per-axis table wiring
//! - [`math`] - Output filter primitives
//!
//! # Architecture
//!
//! ```text
//!  sensing (external)            ballus-core                 actuators (external)
//! ┌──────────────────┐      ┌────────────────────┐      ┌──────────────────┐
//! │ ball position →  │      │  X ─ Pid (xy cfg)  │      │                  │
//! │ error per axis   │─────►│  Y ─ Pid (xy cfg)  │─────►│ motor commands   │
//! │ + tick dt        │      │  Z ─ Pid (z cfg)   │      │                  │
//! └──────────────────┘      └────────────────────┘      └──────────────────┘
//! ```
//!
//! The scheduler that samples the table and picks the tick period lives
//! outside this crate; it calls [`Pid::update`] (or
//! [`TableControllers::update_xyz`]) exactly once per tick.

#![warn(unused_must_use)]

pub mod control;
pub mod math;

// Re-exports for convenience
pub use control::{Axis, Pid, PidConfig, PidPhase, PidState, TableControllers, TableTuning};
pub use math::{Filter, LowPassFilter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for ballus-core
///
/// Every variant signals a defect in the enclosing control loop rather than a
/// transient condition, so none of them is worth retrying. Halt or disable the
/// affected axis instead.
///
/// # Example
/// ```
/// use ballus_core::{Error, Pid, PidConfig};
///
/// let mut pid = Pid::new(PidConfig::table_z()).unwrap();
/// match pid.update(1.0, 0.0) {
///     Err(Error::InvalidInput(msg)) => assert!(msg.contains("dt")),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[must_use = "errors must be handled or explicitly ignored with let _ = ..."]
#[non_exhaustive]
pub enum Error {
    /// Invalid controller configuration (limit, filter coefficient or gains).
    /// Handle by: validating tuning before deployment, checking parameter ranges.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid per-tick input (non-positive `dt`, non-finite error).
    /// Handle by: fixing the scheduler or sensor path that produced it.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation attempted in invalid state (e.g., ticking a disabled axis).
    /// Handle by: enabling the axis before resuming updates.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(format!("JSON error: {}", e))
    }
}

/// Result type alias for ballus-core operations
pub type Result<T> = std::result::Result<T, Error>;
