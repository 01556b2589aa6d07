//! # Axis Shaping
//!
//! Turns raw device axis readings into the normalized motion values carried
//! by a control command.
//!
//! Each motion axis goes through three stages:
//!
//! 1. **Deadzone**: readings within `deadzone` of center become 0.0 and the
//!    rest of the travel is rescaled so full deflection still reaches 1.0.
//! 2. **Expo**: `out = (1 - expo) * in + expo * in³`, softening small stick
//!    movements for fine positioning near the bottom.
//! 3. **Inversion**: flips the sign for sticks whose physical direction is
//!    opposite to the vehicle frame.
//!
//! ```
//! use rov_link::controller::calibration::AxisShape;
//!
//! let shape = AxisShape::new(0.05, 0.3, true);
//! assert_eq!(shape.apply(0.02), 0.0);
//! assert!((shape.apply(1.0) + 1.0).abs() < 0.001);
//! ```

use crate::config::ControllerConfig;

/// Shaping parameters for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisShape {
    deadzone: f32,
    expo: f32,
    inverted: bool,
}

impl Default for AxisShape {
    fn default() -> Self {
        Self::new(0.05, 0.0, false)
    }
}

impl AxisShape {
    /// # Arguments
    ///
    /// * `deadzone` - Center dead band, clamped to 0.0..=0.25
    /// * `expo` - Curve factor, clamped to 0.0..=1.0
    /// * `inverted` - Flip the output sign
    #[must_use]
    pub fn new(deadzone: f32, expo: f32, inverted: bool) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.25),
            expo: expo.clamp(0.0, 1.0),
            inverted,
        }
    }

    /// Pass-through shape.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, false)
    }

    #[must_use]
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    #[must_use]
    pub fn expo(&self) -> f32 {
        self.expo
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Shape a normalized reading. Output stays within −1.0..=1.0.
    #[must_use]
    pub fn apply(&self, input: f32) -> f32 {
        if input.is_nan() {
            return 0.0;
        }
        let magnitude = input.abs().min(1.0);

        let live = if magnitude <= self.deadzone {
            0.0
        } else {
            (magnitude - self.deadzone) / (1.0 - self.deadzone)
        };

        let curved = if self.expo == 0.0 {
            live
        } else {
            (1.0 - self.expo) * live + self.expo * live * live * live
        };

        let signed = curved.copysign(input);
        if self.inverted {
            -signed
        } else {
            signed
        }
    }
}

/// Shapes for the four motion axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionShaping {
    pub x: AxisShape,
    pub y: AxisShape,
    pub z: AxisShape,
    pub w: AxisShape,
}

impl MotionShaping {
    /// Same deadzone and expo on every axis, inversion per `invert_axes`.
    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        let shape = |name: &str| {
            let inverted = config.invert_axes.iter().any(|a| a == name);
            AxisShape::new(config.deadzone, config.expo, inverted)
        };
        Self {
            x: shape("axis_x"),
            y: shape("axis_y"),
            z: shape("axis_z"),
            w: shape("axis_w"),
        }
    }

    /// No shaping at all.
    #[must_use]
    pub fn identity() -> Self {
        let id = AxisShape::identity();
        Self { x: id, y: id, z: id, w: id }
    }
}

/// Map a raw absolute-axis value from its reported range onto −1.0..=1.0.
///
/// ```
/// use rov_link::controller::calibration::normalize_abs;
///
/// assert_eq!(normalize_abs(0, 0, 255), -1.0);
/// assert_eq!(normalize_abs(255, 0, 255), 1.0);
/// assert_eq!(normalize_abs(0, -32768, 32767).abs() < 0.001, true);
/// ```
#[must_use]
pub fn normalize_abs(value: i32, minimum: i32, maximum: i32) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }
    let span = (maximum as f64) - (minimum as f64);
    let offset = (value as f64) - (minimum as f64);
    ((offset / span) * 2.0 - 1.0).clamp(-1.0, 1.0) as f32
}
