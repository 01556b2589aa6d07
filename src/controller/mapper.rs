//! # Input Mapper
//!
//! Produces one fully populated [`ControlCommand`] per tick from the current
//! device state.
//!
//! ## Per-tick pipeline
//!
//! 1. Poll the [`InputDevice`] for a [`DeviceSnapshot`]
//! 2. Resolve logical actions through the [`InputMapping`]
//! 3. Update the manipulator, payload and power-scale latches from the
//!    complete set of held buttons
//! 4. Copy the mapped hat into camera rotation (and manipulator rotation
//!    when no axis is mapped to it)
//! 5. Shape and scale the motion axes, fill in fixed setpoints, clamp
//!
//! ## Degraded mode
//!
//! Without a device (none found at startup, or it stopped answering) every
//! tick yields a neutral command carrying only the fixed setpoints. The
//! condition is reported once through the diagnostics sink.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use rov_link::controller::joystick::Joystick;
//! use rov_link::controller::mapper::{InputMapper, Setpoints};
//! use rov_link::controller::mapping::InputMapping;
//! use rov_link::controller::calibration::MotionShaping;
//! use rov_link::controller::device::InputDevice;
//! use rov_link::diagnostics::TracingSink;
//!
//! let device = Joystick::open().ok().map(|j| Box::new(j) as Box<dyn InputDevice>);
//! let mut mapper = InputMapper::new(
//!     device,
//!     InputMapping::default(),
//!     MotionShaping::identity(),
//!     Setpoints::default(),
//!     Arc::new(TracingSink),
//! );
//! let command = mapper.tick();
//! ```

use std::sync::Arc;
use tracing::debug;

use super::calibration::MotionShaping;
use super::device::{DeviceSnapshot, InputDevice};
use super::latch::{ManipulatorLatch, PayloadLatch, PowerScale};
use super::mapping::InputMapping;
use crate::config::ControlConfig;
use crate::diagnostics::{DiagnosticsSink, LogLevel, OnceLatch};
use crate::protocol::types::{ControlCommand, PayloadSelector, Regulators};

/// Axis deflection past which a mapped manipulator-rotation axis counts as
/// a turn command
const ROTATION_THRESHOLD: f32 = 0.5;

/// Vehicle setpoints that do not come from the joystick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Setpoints {
    pub debug: bool,
    pub regulators: Regulators,
    pub desired_depth: f32,
    pub desired_yaw: f32,
    pub camera_index: u8,
}

impl From<&ControlConfig> for Setpoints {
    fn from(config: &ControlConfig) -> Self {
        Self {
            debug: config.debug_flag,
            regulators: Regulators::from_bits(config.regulators),
            desired_depth: config.desired_depth,
            desired_yaw: config.desired_yaw,
            camera_index: config.camera_index,
        }
    }
}

/// Joystick → control command translator.
pub struct InputMapper {
    device: Option<Box<dyn InputDevice>>,
    mapping: InputMapping,
    shaping: MotionShaping,
    setpoints: Setpoints,
    sink: Arc<dyn DiagnosticsSink>,
    manipulator: ManipulatorLatch,
    payload: PayloadLatch,
    power: PowerScale,
    degraded: OnceLatch,
}

impl std::fmt::Debug for InputMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputMapper")
            .field("device", &self.device.as_ref().map(|d| d.name()))
            .field("mapping", &self.mapping)
            .field("manipulator", &self.manipulator)
            .field("payload", &self.payload)
            .field("power", &self.power)
            .finish_non_exhaustive()
    }
}

impl InputMapper {
    /// # Arguments
    ///
    /// * `device` - Input device, `None` for degraded mode
    /// * `mapping` - Logical action → index table (read-only from here on)
    /// * `shaping` - Deadzone/expo/inversion per motion axis
    /// * `setpoints` - Fixed values copied into every command
    /// * `sink` - Operator diagnostics
    pub fn new(
        device: Option<Box<dyn InputDevice>>,
        mapping: InputMapping,
        shaping: MotionShaping,
        setpoints: Setpoints,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            device,
            mapping,
            shaping,
            setpoints,
            sink,
            manipulator: ManipulatorLatch::default(),
            payload: PayloadLatch::default(),
            power: PowerScale::default(),
            degraded: OnceLatch::default(),
        }
    }

    /// Whether the mapper is producing neutral commands.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.device.is_none()
    }

    /// Active mapping.
    #[must_use]
    pub fn mapping(&self) -> &InputMapping {
        &self.mapping
    }

    /// Current power multiplier.
    #[must_use]
    pub fn power_scale(&self) -> f32 {
        self.power.factor()
    }

    /// Produce this tick's command.
    pub fn tick(&mut self) -> ControlCommand {
        let snapshot = match self.device.as_mut().map(|d| d.poll()) {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(e)) => {
                self.device = None;
                if self.degraded.raise() {
                    self.sink.log(
                        &format!("Joystick lost ({}), sending neutral commands", e),
                        LogLevel::Error,
                    );
                }
                return self.neutral();
            }
            None => {
                if self.degraded.raise() {
                    self.sink
                        .log("No joystick detected, sending neutral commands", LogLevel::Error);
                }
                return self.neutral();
            }
        };

        self.update_latches(&snapshot);
        self.build(&snapshot)
    }

    fn neutral(&self) -> ControlCommand {
        self.with_setpoints(ControlCommand::neutral())
    }

    fn with_setpoints(&self, mut command: ControlCommand) -> ControlCommand {
        command.debug = self.setpoints.debug;
        command.regulators = self.setpoints.regulators;
        command.desired_depth = self.setpoints.desired_depth;
        command.desired_yaw = self.setpoints.desired_yaw;
        command.camera_index = self.setpoints.camera_index;
        command
    }

    fn update_latches(&mut self, snapshot: &DeviceSnapshot) {
        let m = &self.mapping;
        let held = |index: usize| snapshot.button(index);

        if self
            .manipulator
            .update(held(m.manipulator_open), held(m.manipulator_close), held(m.stop_polnagr))
        {
            debug!("Manipulator: {:?}", self.manipulator.state());
        }

        if self.payload.update(held(m.pump), held(m.laser), held(m.stop_polnagr)) {
            let message = match self.payload.state() {
                PayloadSelector::Idle => "Payload stopped",
                PayloadSelector::Pump => "Pump on",
                PayloadSelector::Laser => "Laser on",
            };
            self.sink.log(message, LogLevel::Info);
        }

        if self.power.update(held(m.twenty_power), held(m.fifty_power)) {
            self.sink.log(
                &format!("Thruster power set to {}%", self.power.percent()),
                LogLevel::Info,
            );
        }
    }

    fn build(&self, snapshot: &DeviceSnapshot) -> ControlCommand {
        let m = &self.mapping;
        let scale = self.power.factor();
        let (hat_x, hat_y) = snapshot.hat(m.camera_rotation);

        let manipulator_rotation = match m.manipulator_rotation {
            Some(axis) => {
                let value = snapshot.axis(axis);
                if value >= ROTATION_THRESHOLD {
                    1
                } else if value <= -ROTATION_THRESHOLD {
                    -1
                } else {
                    0
                }
            }
            None => hat_x,
        };

        let command = ControlCommand {
            axis_x: self.shaping.x.apply(snapshot.axis(m.axis_x)) * scale,
            axis_y: self.shaping.y.apply(snapshot.axis(m.axis_y)) * scale,
            axis_z: self.shaping.z.apply(snapshot.axis(m.axis_z)) * scale,
            axis_w: self.shaping.w.apply(snapshot.axis(m.axis_w)) * scale,
            camera_rotation: [hat_x, hat_y, 0],
            manipulator_rotation,
            manipulator: self.manipulator.state(),
            payload: self.payload.state(),
            ..ControlCommand::neutral()
        };

        self.with_setpoints(command).clamped()
    }
}
