//! Math utilities for the control core
//!
//! Filter primitives plus the small saturation helpers the controller uses on
//! its hot path.

mod filter;

pub use filter::{Filter, LowPassFilter};

/// Clamp a value to the symmetric range `[-limit, +limit]`
///
/// `limit` must be non-negative; NaN passes through unchanged.
#[inline]
pub fn clamp_symmetric(value: f64, limit: f64) -> f64 {
    value.clamp(-limit, limit)
}
