//! PID controller implementation
//!
//! A discrete-time PID controller that consumes an error sample per tick and
//! produces a saturated, low-pass filtered actuator command. The integrator is
//! clamped so that the integral term alone can never exceed the output limit,
//! which keeps it from winding up while the output sits in saturation.

use serde::{Deserialize, Serialize};

use crate::math::{clamp_symmetric, Filter, LowPassFilter};
use crate::{Error, Result};

/// Default output limit of the table controllers (+/-)
pub const DEFAULT_OUTPUT_LIMIT: f64 = 500.0;

/// PID controller configuration
///
/// Immutable once handed to a [`Pid`]; swap it as a whole with
/// [`Pid::set_config`] to retune between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Weight of the new sample in the output low-pass filter (0-1).
    /// 1.0 passes the clamped output straight through; 0.0 disables the filter.
    pub output_filter_alpha: f64,
    /// Output saturation limit; output is clamped to [-limit, +limit]
    pub output_limit: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            output_filter_alpha: 1.0,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }
}

impl PidConfig {
    /// Create a new PID config with given gains, unfiltered, with the default limit
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            ..Default::default()
        }
    }

    /// Create a P-only controller config
    pub fn p(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0)
    }

    /// Create a PI controller config
    pub fn pi(kp: f64, ki: f64) -> Self {
        Self::new(kp, ki, 0.0)
    }

    /// Create a PD controller config
    pub fn pd(kp: f64, kd: f64) -> Self {
        Self::new(kp, 0.0, kd)
    }

    /// Tuning of the coupled X-Y ball positioning loop
    pub fn table_xy() -> Self {
        Self::new(0.28, 0.0008, 40.0)
            .with_output_filter(0.85)
            .with_output_limit(DEFAULT_OUTPUT_LIMIT)
    }

    /// Tuning of the Z loop: pure proportional, filter disabled
    pub fn table_z() -> Self {
        Self::p(1.0)
            .with_output_filter(0.0)
            .with_output_limit(DEFAULT_OUTPUT_LIMIT)
    }

    /// Set the output filter coefficient
    pub fn with_output_filter(mut self, alpha: f64) -> Self {
        self.output_filter_alpha = alpha;
        self
    }

    /// Set the output filter coefficient from a cutoff frequency
    ///
    /// # Example
    /// ```
    /// use ballus_core::PidConfig;
    ///
    /// // 5 Hz cutoff on a 100 Hz control loop
    /// let config = PidConfig::pd(0.3, 20.0).with_output_cutoff(5.0, 100.0).unwrap();
    /// assert!(config.output_filter_alpha > 0.0 && config.output_filter_alpha < 1.0);
    /// ```
    pub fn with_output_cutoff(self, cutoff_hz: f64, sample_rate_hz: f64) -> Result<Self> {
        let alpha = LowPassFilter::alpha_from_cutoff(cutoff_hz, sample_rate_hz)?;
        Ok(self.with_output_filter(alpha))
    }

    /// Set the output saturation limit
    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit;
        self
    }

    /// Check the configuration invariants
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the limit is not a positive finite number,
    /// the filter coefficient is outside [0, 1], or a gain is not finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.output_limit > 0.0 && self.output_limit.is_finite()) {
            return Err(Error::Config(format!(
                "output limit must be positive and finite, got {}",
                self.output_limit
            )));
        }
        if !(0.0..=1.0).contains(&self.output_filter_alpha) {
            return Err(Error::Config(format!(
                "output filter alpha must be in [0, 1], got {}",
                self.output_filter_alpha
            )));
        }
        for (name, gain) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !gain.is_finite() {
                return Err(Error::Config(format!("{name} must be finite, got {gain}")));
            }
        }
        Ok(())
    }

    /// Bound on the integral accumulator, `None` when `ki == 0`
    ///
    /// Chosen so that `ki * integral` alone never exceeds the output limit.
    #[inline]
    pub fn integral_limit(&self) -> Option<f64> {
        if self.ki == 0.0 {
            None
        } else {
            Some(self.output_limit / self.ki.abs())
        }
    }

    /// Coefficient the output filter actually runs with (0 means disabled)
    #[inline]
    fn effective_filter_alpha(&self) -> f64 {
        if self.output_filter_alpha == 0.0 {
            1.0
        } else {
            self.output_filter_alpha
        }
    }
}

/// Lifecycle phase of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidPhase {
    /// Fresh or just reset: no derivative history
    Reset,
    /// At least one tick since the last reset
    Running,
}

impl std::fmt::Display for PidPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// PID controller internal state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidState {
    /// Accumulated error x dt, clamped to the anti-windup range; held at 0
    /// while `ki == 0`
    pub integral: f64,
    /// Error of the previous tick; `None` until the first tick after a reset
    pub prev_error: Option<f64>,
    /// Output low-pass filter, holding the last emitted output
    output: LowPassFilter,
}

impl PidState {
    fn new(output: LowPassFilter) -> Self {
        Self {
            integral: 0.0,
            prev_error: None,
            output,
        }
    }

    /// Last emitted (post-filter) output
    pub fn filtered_output(&self) -> f64 {
        self.output.value()
    }
}

/// Result of one tick, computed without touching the controller
pub(crate) struct Tick {
    state: PidState,
    p_term: f64,
    i_term: f64,
    d_term: f64,
}

/// PID controller
///
/// One instance per axis. Each tick:
///
/// 1. integrate `error * dt`, clamped to [`PidConfig::integral_limit`]
/// 2. differentiate the error against the previous tick (zero on the first
///    tick after a reset, so stale history never causes a kick)
/// 3. clamp `kp*e + ki*integral + kd*de/dt` to the output limit
/// 4. low-pass filter the clamped value
///
/// # Example
/// ```
/// use ballus_core::{Pid, PidConfig};
///
/// let mut pid = Pid::new(PidConfig::table_xy()).unwrap();
///
/// // In a control loop
/// let setpoint = 120.0;
/// let measurement = 100.0;
/// let dt = 0.01; // 100Hz
///
/// let command = pid.update(setpoint - measurement, dt).unwrap();
/// assert!(command.abs() <= 500.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Pid {
    config: PidConfig,
    state: PidState,
}

impl Pid {
    /// Create a new PID controller with the given configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: PidConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            tracing::warn!(?config, "rejecting PID configuration: {}", e);
            return Err(e);
        }
        let output = LowPassFilter::new(config.effective_filter_alpha())?;
        Ok(Self {
            config,
            state: PidState::new(output),
        })
    }

    /// Advance the controller by one tick
    ///
    /// # Arguments
    /// * `error` - Setpoint minus measurement
    /// * `dt` - Time since the previous tick in seconds
    ///
    /// # Returns
    /// The filtered command, always within `[-output_limit, +output_limit]`
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if `dt` is not a positive finite number
    /// or `error` is not finite. The controller state is left untouched.
    /// Any finite input produces a bounded command, even when a term overflows.
    #[inline]
    pub fn update(&mut self, error: f64, dt: f64) -> Result<f64> {
        let tick = self.step(error, dt)?;
        Ok(self.commit(tick))
    }

    /// Compute the next tick without committing it
    pub(crate) fn step(&self, error: f64, dt: f64) -> Result<Tick> {
        check_input(error, dt)?;
        let config = &self.config;

        // Clamping also saturates an overflowed error * dt
        let integral = match config.integral_limit() {
            Some(limit) => clamp_symmetric(error.mul_add(dt, self.state.integral), limit),
            None => 0.0,
        };

        let derivative = match self.state.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };

        // Zero gains contribute exactly nothing, even against an overflowed term
        let p_term = config.kp * error;
        let i_term = config.ki * integral;
        let d_term = if config.kd == 0.0 { 0.0 } else { config.kd * derivative };

        let mut raw = p_term + i_term + d_term;
        if raw.is_nan() {
            // Opposing infinite terms: sum them saturated instead
            let limit = config.output_limit;
            raw = clamp_symmetric(p_term, limit)
                + clamp_symmetric(i_term, limit)
                + clamp_symmetric(d_term, limit);
            tracing::debug!(p_term, d_term, raw, "PID terms overflowed, summed saturated");
        }

        let clamped = clamp_symmetric(raw, config.output_limit);
        if clamped != raw {
            tracing::trace!(raw, limit = config.output_limit, "PID output saturated");
        }

        let mut output = self.state.output;
        let filtered = clamp_symmetric(output.update(clamped), config.output_limit);
        output.seed(filtered);

        Ok(Tick {
            state: PidState {
                integral,
                prev_error: Some(error),
                output,
            },
            p_term,
            i_term,
            d_term,
        })
    }

    /// Commit a tick computed by [`Pid::step`]
    pub(crate) fn commit(&mut self, tick: Tick) -> f64 {
        self.state = tick.state;
        self.state.filtered_output()
    }

    /// Reset the controller state
    ///
    /// The next update behaves as on a freshly constructed controller.
    pub fn reset(&mut self) {
        self.state.integral = 0.0;
        self.state.prev_error = None;
        self.state.output.reset();
    }

    /// Swap the configuration between ticks
    ///
    /// State carries over. The integrator is pulled back into the new
    /// anti-windup range (or zeroed if the new config has no integral gain)
    /// and the held output into the new limit.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the new configuration is invalid; the old
    /// one stays in effect.
    pub fn set_config(&mut self, config: PidConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            tracing::warn!(?config, "rejecting PID configuration: {}", e);
            return Err(e);
        }
        self.state.output.set_alpha(config.effective_filter_alpha())?;
        self.state.integral = match config.integral_limit() {
            Some(limit) => clamp_symmetric(self.state.integral, limit),
            None => 0.0,
        };
        let held = self.state.output.value();
        self.state
            .output
            .seed(clamp_symmetric(held, config.output_limit));
        tracing::debug!(?config, "PID configuration updated");
        self.config = config;
        Ok(())
    }

    /// Get the current state
    pub fn state(&self) -> &PidState {
        &self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> PidPhase {
        match self.state.prev_error {
            Some(_) => PidPhase::Running,
            None => PidPhase::Reset,
        }
    }

    /// Last emitted output (0 after a reset)
    pub fn output(&self) -> f64 {
        self.state.filtered_output()
    }

    /// P, I and D contributions the next update would compute, for debugging
    ///
    /// Does not change the controller state.
    pub fn terms(&self, error: f64, dt: f64) -> Result<(f64, f64, f64)> {
        let tick = self.step(error, dt)?;
        Ok((tick.p_term, tick.i_term, tick.d_term))
    }
}

/// Reject tick inputs that would corrupt the integrator or derivative history
pub(crate) fn check_input(error: f64, dt: f64) -> Result<()> {
    if !(dt > 0.0 && dt.is_finite()) {
        tracing::warn!(dt, "rejecting PID tick: dt must be positive and finite");
        return Err(Error::InvalidInput(format!(
            "dt must be positive and finite, got {dt}"
        )));
    }
    if !error.is_finite() {
        tracing::warn!(error, "rejecting PID tick: error must be finite");
        return Err(Error::InvalidInput(format!(
            "error must be finite, got {error}"
        )));
    }
    Ok(())
}
