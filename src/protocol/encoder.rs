//! # Packet Encoder
//!
//! Encodes control commands, hello messages and (for bench tooling and
//! tests) telemetry into wire datagrams.
//!
//! Control layout for the configured schema:
//!
//! ```text
//! 0xAC | version | axisX axisY axisZ axisW (i8 or f32) | debug
//!      | thruster[0..10] | manipRotation | camRot[0] camRot[1] (camRot[2])
//!      | openClose | payload | regulators | desiredDepth f32 | desiredYaw f32
//!      | cameraIndex | crc16
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::{crc16_ccitt, CRC16_SIZE};
use super::types::*;

/// Encoder bound to a single [`ControlSchema`].
///
/// # Examples
///
/// ```
/// use rov_link::protocol::encoder::ControlEncoder;
/// use rov_link::protocol::types::{ControlCommand, ControlSchema};
///
/// let encoder = ControlEncoder::new(ControlSchema::default());
/// let frame = encoder.encode(&ControlCommand { axis_x: 0.5, ..Default::default() });
/// assert_eq!(frame[0], 0xAC);
/// assert_eq!(frame[2] as i8, 50);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ControlEncoder {
    schema: ControlSchema,
}

impl ControlEncoder {
    #[must_use]
    pub fn new(schema: ControlSchema) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn schema(&self) -> ControlSchema {
        self.schema
    }

    /// Encode a control command into a complete datagram.
    ///
    /// The command is clamped first, so an out-of-range caller value is
    /// saturated on the wire rather than wrapped.
    pub fn encode(&self, command: &ControlCommand) -> Bytes {
        let cmd = command.clamped();
        let mut buf = BytesMut::with_capacity(self.schema.encoded_len());

        buf.put_u8(HEADER_CONTROL);
        buf.put_i8(self.schema.version);

        for axis in [cmd.axis_x, cmd.axis_y, cmd.axis_z, cmd.axis_w] {
            match self.schema.axis_encoding {
                AxisEncoding::Int8 => buf.put_i8(axis_to_percent(axis)),
                AxisEncoding::Float32 => buf.put_f32(axis),
            }
        }

        buf.put_u8(cmd.debug as u8);

        for &power in cmd.thruster_power.iter() {
            buf.put_i8(power);
        }

        buf.put_i8(cmd.manipulator_rotation);

        for &rotation in cmd.camera_rotation[..self.schema.camera_axes.count()].iter() {
            buf.put_i8(rotation);
        }

        buf.put_i8(cmd.manipulator.as_i8());
        buf.put_i8(cmd.payload.as_i8());
        buf.put_u8(cmd.regulators.bits());
        buf.put_f32(cmd.desired_depth);
        buf.put_f32(cmd.desired_yaw);
        buf.put_u8(cmd.camera_index);

        finish(buf)
    }
}

/// Encode a hello datagram: `0xAA | version | crc16`.
pub fn encode_hello(version: i8) -> Bytes {
    let mut buf = BytesMut::with_capacity(HELLO_MIN_LEN);
    buf.put_u8(HEADER_HELLO);
    buf.put_i8(version);
    finish(buf)
}

/// Encode telemetry the way vehicle firmware does.
///
/// The v1 layout carries no header, version, camera index or temperature;
/// those fields are dropped and the frame is zero-padded to its minimum
/// length.
pub fn encode_telemetry(telemetry: &Telemetry, layout: TelemetryLayout) -> Bytes {
    let mut buf = BytesMut::with_capacity(layout.min_len());

    if layout == TelemetryLayout::V2 {
        buf.put_u8(HEADER_TELEMETRY);
        buf.put_i8(PROTOCOL_VERSION);
    }

    buf.put_f32(telemetry.depth);
    buf.put_f32(telemetry.pitch);
    buf.put_f32(telemetry.yaw);
    buf.put_f32(telemetry.roll);
    buf.put_f32(telemetry.current);
    buf.put_f32(telemetry.voltage);
    buf.put_u8(telemetry.regulators_feedback);
    buf.put_i8(telemetry.manipulator_angle);
    buf.put_i8(telemetry.manipulator_state);

    match layout {
        TelemetryLayout::V1 => {
            buf.put_bytes(0, TELEMETRY_V1_MIN_LEN - CRC16_SIZE - TELEMETRY_V1_FIELDS_LEN)
        }
        TelemetryLayout::V2 => {
            buf.put_u8(telemetry.camera_index);
            buf.put_f32(telemetry.temperature);
        }
    }

    finish(buf)
}

/// Scale a normalized axis to signed percent.
#[inline]
#[must_use]
pub fn axis_to_percent(axis: f32) -> i8 {
    (clamp_axis(axis) * PERCENT_MAX as f32).round() as i8
}

/// Append the big-endian CRC over everything written so far.
fn finish(mut buf: BytesMut) -> Bytes {
    buf.reserve(CRC16_SIZE);
    let crc = crc16_ccitt(&buf);
    buf.put_u16(crc);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::split_and_compute;

    fn float_schema(camera_axes: CameraAxes) -> ControlSchema {
        ControlSchema {
            version: PROTOCOL_VERSION,
            axis_encoding: AxisEncoding::Float32,
            camera_axes,
        }
    }

    #[test]
    fn test_encode_neutral_length() {
        let encoder = ControlEncoder::new(ControlSchema::default());
        let frame = encoder.encode(&ControlCommand::neutral());
        assert_eq!(frame.len(), ControlSchema::default().encoded_len());
    }

    #[test]
    fn test_encode_header_and_version() {
        let encoder = ControlEncoder::new(ControlSchema::default());
        let frame = encoder.encode(&ControlCommand::neutral());
        assert_eq!(frame[0], HEADER_CONTROL);
        assert_eq!(frame[1] as i8, PROTOCOL_VERSION);
    }

    #[test]
    fn test_encode_crc_valid() {
        let encoder = ControlEncoder::new(ControlSchema::default());
        let frame = encoder.encode(&ControlCommand {
            axis_x: 0.3,
            axis_w: -0.7,
            ..Default::default()
        });

        let (declared, computed) = split_and_compute(&frame).unwrap();
        assert_eq!(declared, computed);
    }

    #[test]
    fn test_encode_int8_axes_clamped() {
        let encoder = ControlEncoder::new(ControlSchema::default());
        let frame = encoder.encode(&ControlCommand {
            axis_x: 2.0,
            axis_y: -2.0,
            axis_z: 0.5,
            axis_w: -0.25,
            ..Default::default()
        });

        // Saturates at ±100, never wraps to the other sign
        assert_eq!(frame[2] as i8, 100);
        assert_eq!(frame[3] as i8, -100);
        assert_eq!(frame[4] as i8, 50);
        assert_eq!(frame[5] as i8, -25);
    }

    #[test]
    fn test_encode_float32_axes() {
        let encoder = ControlEncoder::new(float_schema(CameraAxes::Two));
        let frame = encoder.encode(&ControlCommand {
            axis_x: 0.5,
            axis_y: 1.75,
            ..Default::default()
        });

        let axis_x = f32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]);
        let axis_y = f32::from_be_bytes([frame[6], frame[7], frame[8], frame[9]]);
        assert_eq!(axis_x, 0.5);
        assert_eq!(axis_y, 1.0);
        assert_eq!(frame.len(), float_schema(CameraAxes::Two).encoded_len());
    }

    #[test]
    fn test_encode_three_camera_axes() {
        let encoder = ControlEncoder::new(float_schema(CameraAxes::Three));
        let frame = encoder.encode(&ControlCommand {
            camera_rotation: [10, -20, 30],
            ..Default::default()
        });

        // header(2) + axes(16) + debug(1) + thrusters(10) + manip(1)
        let cam = 30;
        assert_eq!(frame[cam] as i8, 10);
        assert_eq!(frame[cam + 1] as i8, -20);
        assert_eq!(frame[cam + 2] as i8, 30);
        assert_eq!(frame.len(), 47);
    }

    #[test]
    fn test_encode_trailing_fields() {
        let encoder = ControlEncoder::new(ControlSchema::default());
        let frame = encoder.encode(&ControlCommand {
            manipulator: ManipulatorDirection::Close,
            payload: PayloadSelector::Laser,
            regulators: Regulators::from_bits(Regulators::DEPTH),
            desired_depth: 2.5,
            desired_yaw: 180.0,
            camera_index: 1,
            ..Default::default()
        });

        // header(2) + axes(4) + debug(1) + thrusters(10) + manip(1) + cam(2)
        let base = 20;
        assert_eq!(frame[base] as i8, -1);
        assert_eq!(frame[base + 1] as i8, 2);
        assert_eq!(frame[base + 2], 0x01);
        let depth = f32::from_be_bytes(frame[base + 3..base + 7].try_into().unwrap());
        let yaw = f32::from_be_bytes(frame[base + 7..base + 11].try_into().unwrap());
        assert_eq!(depth, 2.5);
        assert_eq!(yaw, 180.0);
        assert_eq!(frame[base + 11], 1);
    }

    #[test]
    fn test_encode_hello() {
        let frame = encode_hello(PROTOCOL_VERSION);
        assert_eq!(frame.len(), HELLO_MIN_LEN);
        assert_eq!(frame[0], HEADER_HELLO);
        assert_eq!(frame[1], 2);

        let (declared, computed) = split_and_compute(&frame).unwrap();
        assert_eq!(declared, computed);
    }

    #[test]
    fn test_encode_telemetry_lengths() {
        let telemetry = Telemetry::default();
        assert_eq!(
            encode_telemetry(&telemetry, TelemetryLayout::V1).len(),
            TELEMETRY_V1_MIN_LEN
        );
        assert_eq!(
            encode_telemetry(&telemetry, TelemetryLayout::V2).len(),
            TELEMETRY_V2_MIN_LEN
        );
    }

    #[test]
    fn test_axis_to_percent() {
        assert_eq!(axis_to_percent(0.0), 0);
        assert_eq!(axis_to_percent(1.0), 100);
        assert_eq!(axis_to_percent(-1.0), -100);
        assert_eq!(axis_to_percent(0.504), 50);
        assert_eq!(axis_to_percent(f32::NAN), 0);
        assert_eq!(axis_to_percent(f32::INFINITY), 100);
    }

    #[test]
    fn test_different_commands_different_crc() {
        let encoder = ControlEncoder::new(ControlSchema::default());
        let a = encoder.encode(&ControlCommand { axis_x: 0.1, ..Default::default() });
        let b = encoder.encode(&ControlCommand { axis_x: 0.2, ..Default::default() });
        assert_ne!(a[a.len() - 2..], b[b.len() - 2..]);
    }
}
