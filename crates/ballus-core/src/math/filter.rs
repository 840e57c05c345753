//! Digital filters for signal processing
//!
//! The controller smooths its final command with a first-order low-pass
//! filter to keep actuator noise down.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Trait for digital filters
pub trait Filter: Send + Sync {
    /// Update the filter with a new value and return the filtered output
    fn update(&mut self, value: f64) -> f64;

    /// Reset the filter state
    fn reset(&mut self);

    /// Get the current filtered value without updating
    fn value(&self) -> f64;
}

/// First-order low-pass filter (exponential moving average)
///
/// `value = alpha * sample + (1 - alpha) * value`, seeded at zero, so after a
/// reset the output ramps up from rest toward the incoming samples.
/// Alpha 1 passes samples through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPassFilter {
    /// Filter coefficient (0-1). Lower = more smoothing.
    alpha: f64,
    /// Current filtered value
    value: f64,
}

impl LowPassFilter {
    /// Create a new low-pass filter with the given alpha coefficient
    ///
    /// # Errors
    /// Returns [`Error::Config`] if alpha is not in range [0, 1]
    pub fn new(alpha: f64) -> Result<Self> {
        Self::check_alpha(alpha)?;
        Ok(Self { alpha, value: 0.0 })
    }

    /// A filter that passes every sample through unchanged
    pub const fn passthrough() -> Self {
        Self {
            alpha: 1.0,
            value: 0.0,
        }
    }

    /// Compute alpha from a cutoff frequency and sample rate
    ///
    /// alpha = dt / (RC + dt) where RC = 1 / (2 * pi * cutoff)
    pub fn alpha_from_cutoff(cutoff_hz: f64, sample_rate_hz: f64) -> Result<f64> {
        if !(cutoff_hz > 0.0 && sample_rate_hz > 0.0) {
            return Err(Error::Config(format!(
                "cutoff ({cutoff_hz} Hz) and sample rate ({sample_rate_hz} Hz) must be positive"
            )));
        }
        let dt = 1.0 / sample_rate_hz;
        let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz);
        Ok((dt / (rc + dt)).clamp(0.0, 1.0))
    }

    /// Get the alpha coefficient
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Set the alpha coefficient, keeping the current value
    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        Self::check_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    /// Overwrite the current value
    pub fn seed(&mut self, value: f64) {
        self.value = value;
    }

    /// Value the filter would produce for `sample`, without committing it
    ///
    /// Kept in the two-product form so that alpha = 1 returns `sample` bit for bit.
    #[inline]
    pub fn peek(&self, sample: f64) -> f64 {
        self.alpha * sample + (1.0 - self.alpha) * self.value
    }

    fn check_alpha(alpha: f64) -> Result<()> {
        if (0.0..=1.0).contains(&alpha) {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "filter alpha must be between 0 and 1, got {alpha}"
            )))
        }
    }
}

impl Filter for LowPassFilter {
    #[inline]
    fn update(&mut self, value: f64) -> f64 {
        self.value = self.peek(value);
        self.value
    }

    fn reset(&mut self) {
        self.value = 0.0;
    }

    fn value(&self) -> f64 {
        self.value
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::passthrough()
    }
}
