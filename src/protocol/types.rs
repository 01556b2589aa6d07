//! # Wire Protocol Constants and Types
//!
//! Core definitions shared by the encoder and decoder.
//!
//! Every datagram starts with a one-byte message-type header and ends with a
//! big-endian CRC-16 over everything before it. All multi-byte fields are
//! big-endian.

use serde::Deserialize;

/// Hello (handshake) message header
pub const HEADER_HELLO: u8 = 0xAA;

/// Control command header (ground → vehicle)
pub const HEADER_CONTROL: u8 = 0xAC;

/// Telemetry v2 header (vehicle → ground)
pub const HEADER_TELEMETRY: u8 = 0xAE;

/// Protocol version announced in hello and control messages
pub const PROTOCOL_VERSION: i8 = 2;

/// Number of individually addressable thrusters
pub const THRUSTER_COUNT: usize = 10;

/// Bound for percentage-style signed fields (axes in int8 schema, thrusters,
/// manipulator rotation, camera rotation)
pub const PERCENT_MAX: i8 = 100;

/// Hello: header(1) + version(1) + crc(2)
pub const HELLO_MIN_LEN: usize = 4;

/// Field bytes of the legacy telemetry layout, which starts straight at depth
/// with no header or version: 6×f32(24) + regulators(1) + angle(1) + state(1)
pub const TELEMETRY_V1_FIELDS_LEN: usize = 27;

/// Telemetry v1: fields(27) + reserved(1) + crc(2)
pub const TELEMETRY_V1_MIN_LEN: usize = 30;

/// Telemetry v2: header(1) + version(1) + 6×f32(24) + regulators(1) + angle(1)
/// + state(1) + camera(1) + temperature f32(4) + crc(2)
pub const TELEMETRY_V2_MIN_LEN: usize = 36;

/// Largest datagram the receive path will accept
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Width used for the four motion axes of a control command.
///
/// A session is configured with exactly one encoding; widths are never
/// mixed within one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisEncoding {
    /// Signed 8-bit percent, −100..=100
    #[default]
    Int8,
    /// IEEE-754 single, −1.0..=1.0
    Float32,
}

impl AxisEncoding {
    /// Bytes per axis on the wire.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            AxisEncoding::Int8 => 1,
            AxisEncoding::Float32 => 4,
        }
    }
}

/// Number of camera-rotation components carried by a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraAxes {
    /// Pan/tilt pair
    #[default]
    Two,
    /// Three rotary cameras
    Three,
}

impl CameraAxes {
    /// Parses the configured component count (2 or 3).
    #[must_use]
    pub fn from_count(count: u8) -> Option<Self> {
        match count {
            2 => Some(CameraAxes::Two),
            3 => Some(CameraAxes::Three),
            _ => None,
        }
    }

    /// Number of components written to the wire.
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            CameraAxes::Two => 2,
            CameraAxes::Three => 3,
        }
    }
}

/// Fixed control-message schema a [`ControlEncoder`](super::encoder::ControlEncoder)
/// is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSchema {
    pub version: i8,
    pub axis_encoding: AxisEncoding,
    pub camera_axes: CameraAxes,
}

impl Default for ControlSchema {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            axis_encoding: AxisEncoding::Int8,
            camera_axes: CameraAxes::Two,
        }
    }
}

impl ControlSchema {
    /// Total encoded length including header and CRC.
    ///
    /// ```
    /// use rov_link::protocol::types::ControlSchema;
    ///
    /// // 2 + 4 + 1 + 10 + 1 + 2 + 1 + 1 + 1 + 4 + 4 + 1 + 2
    /// assert_eq!(ControlSchema::default().encoded_len(), 34);
    /// ```
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        2 // header + version
            + 4 * self.axis_encoding.width()
            + 1 // debug flag
            + THRUSTER_COUNT
            + 1 // manipulator rotation
            + self.camera_axes.count()
            + 3 // open/close, payload, regulators
            + 8 // desired depth + desired yaw
            + 1 // camera index
            + super::crc::CRC16_SIZE
    }
}

/// Latched manipulator grip direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulatorDirection {
    Close,
    #[default]
    Stop,
    Open,
}

impl ManipulatorDirection {
    /// Wire value: −1 close, 0 stop, +1 open.
    #[must_use]
    pub fn as_i8(self) -> i8 {
        match self {
            ManipulatorDirection::Close => -1,
            ManipulatorDirection::Stop => 0,
            ManipulatorDirection::Open => 1,
        }
    }
}

/// Latched payload selector (pump / laser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadSelector {
    #[default]
    Idle,
    Pump,
    Laser,
}

impl PayloadSelector {
    /// Wire value: 0 idle, 1 pump, 2 laser.
    #[must_use]
    pub fn as_i8(self) -> i8 {
        match self {
            PayloadSelector::Idle => 0,
            PayloadSelector::Pump => 1,
            PayloadSelector::Laser => 2,
        }
    }
}

/// Regulator enable bits sent to the vehicle and echoed back in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Regulators(u8);

impl Regulators {
    /// Depth hold
    pub const DEPTH: u8 = 0x01;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn depth_hold(self) -> bool {
        self.0 & Self::DEPTH != 0
    }
}

/// One outbound actuation intent.
///
/// Motion axes are normalized to −1.0..=1.0 regardless of the wire schema;
/// the encoder scales them to percent for [`AxisEncoding::Int8`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlCommand {
    pub axis_x: f32,
    pub axis_y: f32,
    pub axis_z: f32,
    pub axis_w: f32,
    /// Camera rotation per component (−100..=100). The third component is
    /// only written by three-axis schemas.
    pub camera_rotation: [i8; 3],
    pub thruster_power: [i8; THRUSTER_COUNT],
    pub debug: bool,
    pub manipulator_rotation: i8,
    pub manipulator: ManipulatorDirection,
    pub payload: PayloadSelector,
    pub regulators: Regulators,
    pub desired_depth: f32,
    pub desired_yaw: f32,
    /// Active camera, 0 or 1
    pub camera_index: u8,
}

impl ControlCommand {
    /// All actuators neutral, camera 0.
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Returns a copy with every bounded field clamped to its range.
    ///
    /// Out-of-range input saturates; nothing wraps. NaN axes become 0.
    ///
    /// ```
    /// use rov_link::protocol::types::ControlCommand;
    ///
    /// let cmd = ControlCommand { axis_x: 3.0, manipulator_rotation: -128, ..Default::default() };
    /// let clamped = cmd.clamped();
    /// assert_eq!(clamped.axis_x, 1.0);
    /// assert_eq!(clamped.manipulator_rotation, -100);
    /// ```
    #[must_use]
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        out.axis_x = clamp_axis(self.axis_x);
        out.axis_y = clamp_axis(self.axis_y);
        out.axis_z = clamp_axis(self.axis_z);
        out.axis_w = clamp_axis(self.axis_w);
        out.camera_rotation = self.camera_rotation.map(clamp_percent);
        out.thruster_power = self.thruster_power.map(clamp_percent);
        out.manipulator_rotation = clamp_percent(self.manipulator_rotation);
        out.camera_index = self.camera_index.min(1);
        out
    }
}

/// Clamps a normalized axis to −1.0..=1.0.
#[inline]
#[must_use]
pub fn clamp_axis(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Clamps a signed percent field to −100..=100.
#[inline]
#[must_use]
pub fn clamp_percent(value: i8) -> i8 {
    value.clamp(-PERCENT_MAX, PERCENT_MAX)
}

/// Telemetry layout generation a packet was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryLayout {
    /// Legacy firmware: no version byte, camera index or temperature
    V1,
    /// Header 0xAE with version, camera index and temperature
    V2,
}

impl TelemetryLayout {
    /// Minimum datagram length including CRC.
    #[must_use]
    pub fn min_len(self) -> usize {
        match self {
            TelemetryLayout::V1 => TELEMETRY_V1_MIN_LEN,
            TelemetryLayout::V2 => TELEMETRY_V2_MIN_LEN,
        }
    }
}

/// Most recent vehicle state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Telemetry {
    /// Depth in meters
    pub depth: f32,
    /// Pitch in degrees (−180..180)
    pub pitch: f32,
    /// Yaw in degrees (0..360)
    pub yaw: f32,
    /// Roll in degrees (−180..180)
    pub roll: f32,
    /// Current draw in amperes
    pub current: f32,
    /// Supply voltage in volts
    pub voltage: f32,
    /// Water temperature in °C (0 for v1 packets)
    pub temperature: f32,
    pub regulators_feedback: u8,
    pub manipulator_angle: i8,
    /// −1 closed, +1 open
    pub manipulator_state: i8,
    /// Active camera (0 for v1 packets)
    pub camera_index: u8,
}

/// Liveness message carrying only the sender's protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    pub version: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_constants() {
        assert_eq!(HEADER_HELLO, 0xAA);
        assert_eq!(HEADER_CONTROL, 0xAC);
        assert_eq!(HEADER_TELEMETRY, 0xAE);
        assert_eq!(PROTOCOL_VERSION, 2);
    }

    #[test]
    fn test_minimum_lengths() {
        assert_eq!(HELLO_MIN_LEN, 4);
        assert_eq!(TelemetryLayout::V1.min_len(), 30);
        assert_eq!(TelemetryLayout::V2.min_len(), 36);
    }

    #[test]
    fn test_schema_lengths() {
        let legacy = ControlSchema::default();
        assert_eq!(legacy.encoded_len(), 34);

        let float3 = ControlSchema {
            version: PROTOCOL_VERSION,
            axis_encoding: AxisEncoding::Float32,
            camera_axes: CameraAxes::Three,
        };
        // 12 more bytes for float axes, one more camera component
        assert_eq!(float3.encoded_len(), 47);
    }

    #[test]
    fn test_camera_axes_from_count() {
        assert_eq!(CameraAxes::from_count(2), Some(CameraAxes::Two));
        assert_eq!(CameraAxes::from_count(3), Some(CameraAxes::Three));
        assert_eq!(CameraAxes::from_count(4), None);
    }

    #[test]
    fn test_latched_wire_values() {
        assert_eq!(ManipulatorDirection::Close.as_i8(), -1);
        assert_eq!(ManipulatorDirection::Stop.as_i8(), 0);
        assert_eq!(ManipulatorDirection::Open.as_i8(), 1);
        assert_eq!(PayloadSelector::Idle.as_i8(), 0);
        assert_eq!(PayloadSelector::Pump.as_i8(), 1);
        assert_eq!(PayloadSelector::Laser.as_i8(), 2);
    }

    #[test]
    fn test_regulators_depth_bit() {
        assert!(Regulators::from_bits(0x01).depth_hold());
        assert!(!Regulators::from_bits(0x02).depth_hold());
        assert_eq!(Regulators::default().bits(), 0);
    }

    #[test]
    fn test_neutral_command() {
        let cmd = ControlCommand::neutral();
        assert_eq!(cmd.axis_x, 0.0);
        assert_eq!(cmd.manipulator, ManipulatorDirection::Stop);
        assert_eq!(cmd.payload, PayloadSelector::Idle);
        assert_eq!(cmd.thruster_power, [0; THRUSTER_COUNT]);
    }

    #[test]
    fn test_clamped_saturates_not_wraps() {
        let cmd = ControlCommand {
            axis_x: 1.5,
            axis_y: -7.0,
            axis_z: f32::NAN,
            axis_w: 0.25,
            camera_rotation: [127, -128, 50],
            thruster_power: [120; THRUSTER_COUNT],
            manipulator_rotation: 101,
            camera_index: 9,
            ..Default::default()
        };

        let out = cmd.clamped();
        assert_eq!(out.axis_x, 1.0);
        assert_eq!(out.axis_y, -1.0);
        assert_eq!(out.axis_z, 0.0);
        assert_eq!(out.axis_w, 0.25);
        assert_eq!(out.camera_rotation, [100, -100, 50]);
        assert_eq!(out.thruster_power, [100; THRUSTER_COUNT]);
        assert_eq!(out.manipulator_rotation, 100);
        assert_eq!(out.camera_index, 1);
    }
}
