//! Per-axis controllers of the ball-balancing table
//!
//! X and Y share the X-Y tuning but keep independent state; Z has its own
//! tuning. No axis ever reads another axis's state.

use serde::{Deserialize, Serialize};

use super::pid::{check_input, Pid, PidConfig};
use crate::{Error, Result};

/// Controlled axis of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes, in tick order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Z => write!(f, "z"),
        }
    }
}

/// Tuning for the whole table
///
/// Serialized as a JSON object with `xy` and `z` keys; a missing key falls
/// back to the stock tuning for that loop, an unknown key is an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableTuning {
    /// Shared by the X and Y controllers
    pub xy: PidConfig,
    /// Z controller
    pub z: PidConfig,
}

impl Default for TableTuning {
    fn default() -> Self {
        Self {
            xy: PidConfig::table_xy(),
            z: PidConfig::table_z(),
        }
    }
}

impl TableTuning {
    /// Configuration used by the given axis
    pub fn for_axis(&self, axis: Axis) -> PidConfig {
        match axis {
            Axis::X | Axis::Y => self.xy,
            Axis::Z => self.z,
        }
    }

    /// Validate both configurations
    pub fn validate(&self) -> Result<()> {
        self.xy.validate().map_err(tag_group("xy"))?;
        self.z.validate().map_err(tag_group("z"))
    }

    /// Parse and validate a JSON tuning document
    ///
    /// # Errors
    /// Returns [`Error::Config`] on malformed JSON, unknown keys, or a
    /// configuration that fails validation.
    ///
    /// # Example
    /// ```
    /// use ballus_core::TableTuning;
    ///
    /// let tuning = TableTuning::from_json(
    ///     r#"{"z": {"kp": 2.0, "ki": 0.0, "kd": 0.0, "output_filter_alpha": 0.0, "output_limit": 300.0}}"#,
    /// ).unwrap();
    /// assert_eq!(tuning.z.kp, 2.0);
    /// assert_eq!(tuning.xy.kp, 0.28);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to a pretty-printed JSON document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Prefix a configuration error with the loop it came from
fn tag_group(group: &'static str) -> impl Fn(Error) -> Error {
    move |e| match e {
        Error::Config(msg) => Error::Config(format!("{group}: {msg}")),
        other => other,
    }
}

/// A controller plus its enabled flag
#[derive(Debug, Clone, Copy)]
struct AxisController {
    pid: Pid,
    enabled: bool,
}

impl AxisController {
    fn new(config: PidConfig) -> Result<Self> {
        Ok(Self {
            pid: Pid::new(config)?,
            enabled: true,
        })
    }
}

/// The three axis controllers of the table
///
/// # Example
/// ```
/// use ballus_core::{Axis, TableControllers, TableTuning};
///
/// let mut table = TableControllers::new(TableTuning::default()).unwrap();
///
/// // One tick: errors for X, Y, Z and the elapsed time
/// let [x, y, z] = table.update_xyz([12.0, -4.0, 30.0], 0.01).unwrap();
/// assert_eq!(z, 30.0);
///
/// // Park the Z axis
/// table.disable(Axis::Z);
/// assert!(table.update(Axis::Z, 1.0, 0.01).is_err());
/// # let _ = (x, y);
/// ```
#[derive(Debug, Clone)]
pub struct TableControllers {
    tuning: TableTuning,
    axes: [AxisController; 3],
}

impl TableControllers {
    /// Create the X, Y and Z controllers from a tuning set
    ///
    /// # Errors
    /// Returns [`Error::Config`] if either configuration is invalid.
    pub fn new(tuning: TableTuning) -> Result<Self> {
        tuning.validate()?;
        let axes = [
            AxisController::new(tuning.for_axis(Axis::X))?,
            AxisController::new(tuning.for_axis(Axis::Y))?,
            AxisController::new(tuning.for_axis(Axis::Z))?,
        ];
        Ok(Self { tuning, axes })
    }

    fn index(axis: Axis) -> usize {
        match axis {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn axis(&self, axis: Axis) -> &AxisController {
        &self.axes[Self::index(axis)]
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut AxisController {
        &mut self.axes[Self::index(axis)]
    }

    fn ensure_enabled(&self, axis: Axis) -> Result<()> {
        if self.axis(axis).enabled {
            Ok(())
        } else {
            tracing::warn!(%axis, "rejecting tick for disabled axis");
            Err(Error::InvalidState(format!("axis {axis} is disabled")))
        }
    }

    /// Advance one axis by one tick
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] if the axis is disabled and
    /// [`Error::InvalidInput`] for a rejected tick (see [`Pid::update`]).
    pub fn update(&mut self, axis: Axis, error: f64, dt: f64) -> Result<f64> {
        self.ensure_enabled(axis)?;
        self.axis_mut(axis).pid.update(error, dt)
    }

    /// Advance all three axes by one tick
    ///
    /// Either every axis advances or none does: all inputs are checked and
    /// all ticks computed before any state is committed.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] if any axis is disabled and
    /// [`Error::InvalidInput`] if `dt` or any error is rejected.
    pub fn update_xyz(&mut self, errors: [f64; 3], dt: f64) -> Result<[f64; 3]> {
        for (axis, error) in Axis::ALL.into_iter().zip(errors) {
            self.ensure_enabled(axis)?;
            check_input(error, dt)?;
        }
        let [x, y, z] =
            Axis::ALL.map(|axis| self.axis(axis).pid.step(errors[Self::index(axis)], dt));
        let ticks = [x?, y?, z?];

        let mut outputs = [0.0; 3];
        for ((slot, tick), output) in self.axes.iter_mut().zip(ticks).zip(outputs.iter_mut()) {
            *output = slot.pid.commit(tick);
        }
        Ok(outputs)
    }

    /// Reset one axis controller
    pub fn reset(&mut self, axis: Axis) {
        tracing::debug!(%axis, "resetting axis controller");
        self.axis_mut(axis).pid.reset();
    }

    /// Reset all axis controllers
    pub fn reset_all(&mut self) {
        for axis in Axis::ALL {
            self.reset(axis);
        }
    }

    /// Reset an axis and stop accepting ticks for it
    pub fn disable(&mut self, axis: Axis) {
        let slot = self.axis_mut(axis);
        slot.pid.reset();
        slot.enabled = false;
        tracing::debug!(%axis, "axis disabled");
    }

    /// Resume accepting ticks for an axis; it starts from a reset state
    pub fn enable(&mut self, axis: Axis) {
        let slot = self.axis_mut(axis);
        if !slot.enabled {
            slot.pid.reset();
            slot.enabled = true;
            tracing::debug!(%axis, "axis enabled");
        }
    }

    /// Whether the axis accepts ticks
    pub fn is_enabled(&self, axis: Axis) -> bool {
        self.axis(axis).enabled
    }

    /// Swap the tuning of every axis between ticks
    ///
    /// Validated up front, so a bad tuning changes nothing.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if either configuration is invalid.
    pub fn set_tuning(&mut self, tuning: TableTuning) -> Result<()> {
        if let Err(e) = tuning.validate() {
            tracing::warn!("rejecting table tuning: {}", e);
            return Err(e);
        }
        for axis in Axis::ALL {
            self.axis_mut(axis).pid.set_config(tuning.for_axis(axis))?;
        }
        self.tuning = tuning;
        Ok(())
    }

    /// Current tuning
    pub fn tuning(&self) -> &TableTuning {
        &self.tuning
    }

    /// Controller of an axis, for inspection
    pub fn controller(&self, axis: Axis) -> &Pid {
        &self.axis(axis).pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PidPhase;
    use approx::assert_relative_eq;

    #[test]
    fn test_axes_are_independent() {
        let mut table = TableControllers::new(TableTuning::default()).unwrap();
        for _ in 0..10 {
            table.update(Axis::X, 50.0, 0.01).unwrap();
        }
        assert_eq!(table.controller(Axis::X).phase(), PidPhase::Running);
        assert_eq!(table.controller(Axis::Y).phase(), PidPhase::Reset);
        assert_relative_eq!(table.controller(Axis::Y).output(), 0.0);

        // Y behaves like a fresh X-Y controller
        let mut fresh = Pid::new(PidConfig::table_xy()).unwrap();
        assert_eq!(
            table.update(Axis::Y, 50.0, 0.01).unwrap(),
            fresh.update(50.0, 0.01).unwrap()
        );
    }

    #[test]
    fn test_default_tuning() {
        let table = TableControllers::new(TableTuning::default()).unwrap();
        for axis in [Axis::X, Axis::Y] {
            let config = table.controller(axis).config();
            assert_relative_eq!(config.kp, 0.28);
            assert_relative_eq!(config.ki, 0.0008);
            assert_relative_eq!(config.kd, 40.0);
            assert_relative_eq!(config.output_filter_alpha, 0.85);
            assert_relative_eq!(config.output_limit, 500.0);
        }
        assert_eq!(*table.controller(Axis::Z).config(), PidConfig::table_z());
    }

    #[test]
    fn test_update_xyz_matches_single_axis_updates() {
        let mut batched = TableControllers::new(TableTuning::default()).unwrap();
        let mut single = TableControllers::new(TableTuning::default()).unwrap();

        for i in 0..20 {
            let errors = [i as f64, -2.0 * i as f64, 900.0 - 100.0 * i as f64];
            let outputs = batched.update_xyz(errors, 0.01).unwrap();
            let per_axis = Axis::ALL.into_iter().zip(errors.into_iter().zip(outputs));
            for (axis, (error, output)) in per_axis {
                assert_eq!(single.update(axis, error, 0.01).unwrap(), output);
            }
        }
    }

    #[test]
    fn test_update_xyz_is_all_or_nothing() {
        let mut table = TableControllers::new(TableTuning::default()).unwrap();
        table.update_xyz([1.0, 2.0, 3.0], 0.01).unwrap();
        let before: Vec<_> = Axis::ALL.iter().map(|&a| *table.controller(a).state()).collect();

        assert!(table.update_xyz([1.0, 2.0, f64::NAN], 0.01).is_err());
        assert!(table.update_xyz([1.0, 2.0, 3.0], 0.0).is_err());

        table.disable(Axis::Y);
        assert!(matches!(
            table.update_xyz([1.0, 2.0, 3.0], 0.01),
            Err(Error::InvalidState(_))
        ));

        assert_eq!(*table.controller(Axis::X).state(), before[0]);
        assert_eq!(*table.controller(Axis::Z).state(), before[2]);
    }

    #[test]
    fn test_disable_and_enable() {
        let mut table = TableControllers::new(TableTuning::default()).unwrap();
        table.update(Axis::Z, 20.0, 0.01).unwrap();

        table.disable(Axis::Z);
        assert!(!table.is_enabled(Axis::Z));
        assert_eq!(table.controller(Axis::Z).phase(), PidPhase::Reset);
        assert!(matches!(
            table.update(Axis::Z, 1.0, 0.01),
            Err(Error::InvalidState(_))
        ));

        // Other axes keep running
        assert!(table.update(Axis::X, 1.0, 0.01).is_ok());

        table.enable(Axis::Z);
        assert!(table.is_enabled(Axis::Z));
        assert_eq!(table.update(Axis::Z, -42.0, 0.01).unwrap(), -42.0);
    }

    #[test]
    fn test_reset_all() {
        let mut table = TableControllers::new(TableTuning::default()).unwrap();
        table.update_xyz([10.0, 20.0, 30.0], 0.01).unwrap();
        table.reset_all();
        for axis in Axis::ALL {
            assert_eq!(table.controller(axis).phase(), PidPhase::Reset);
            assert_relative_eq!(table.controller(axis).output(), 0.0);
        }
    }

    #[test]
    fn test_set_tuning() {
        let mut table = TableControllers::new(TableTuning::default()).unwrap();
        let tuning = TableTuning {
            xy: PidConfig::table_xy().with_output_limit(100.0),
            z: PidConfig::p(2.0).with_output_limit(50.0),
        };
        table.set_tuning(tuning).unwrap();
        assert_eq!(table.update(Axis::Z, 40.0, 0.01).unwrap(), 50.0);
        assert_eq!(*table.tuning(), tuning);

        let bad = TableTuning {
            z: PidConfig::p(2.0).with_output_filter(3.0),
            ..tuning
        };
        assert!(table.set_tuning(bad).is_err());
        assert_eq!(*table.tuning(), tuning);
        assert_relative_eq!(table.controller(Axis::X).config().output_limit, 100.0);
    }

    #[test]
    fn test_tuning_json() {
        let tuning = TableTuning::from_json("{}").unwrap();
        assert_eq!(tuning, TableTuning::default());

        let json = TableTuning::default().to_json().unwrap();
        assert!(json.contains("\"xy\""));
        assert!(json.contains("\"output_filter_alpha\""));

        let err = TableTuning::from_json(
            r#"{"xy": {"kp": 1.0, "ki": 0.0, "kd": 0.0, "output_filter_alpha": 0.5, "output_limit": -1.0}}"#,
        );
        assert!(matches!(err, Err(Error::Config(_))));
        assert!(matches!(TableTuning::from_json("not json"), Err(Error::Config(_))));
    }

    #[test]
    fn test_tuning_json_rejects_unknown_keys() {
        let upper = r#"{"XY": {"kp": 2.0, "ki": 0.0, "kd": 0.0, "output_filter_alpha": 0.5, "output_limit": 100.0}}"#;
        assert!(matches!(TableTuning::from_json(upper), Err(Error::Config(_))));

        let typo = r#"{"z": {"kp": 2.0, "ki": 0.0, "kd": 0.0, "output_filter": 0.5, "output_limit": 100.0}}"#;
        assert!(matches!(TableTuning::from_json(typo), Err(Error::Config(_))));
    }

    #[test]
    fn test_new_rejects_invalid_tuning() {
        let tuning = TableTuning {
            xy: PidConfig::table_xy().with_output_limit(0.0),
            ..Default::default()
        };
        assert!(matches!(TableControllers::new(tuning), Err(Error::Config(_))));
    }
}
