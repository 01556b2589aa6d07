//! # Packet Decoder
//!
//! Identifies and decodes inbound datagrams (telemetry v1/v2, hello).
//!
//! Dispatch is keyed by the first byte and the datagram length:
//!
//! | Header | Length | Result |
//! |--------|--------|--------|
//! | `0xAE` | ≥ 36 | telemetry v2 |
//! | `0xAA` | ≥ 4 | hello |
//! | `0xAC` | any | rejected: control messages only flow outbound |
//! | other | ≥ 30 | telemetry v1 (legacy firmware, no header: byte 0 is depth) |
//! | other | < 30 | rejected: unknown header |
//!
//! Length is checked before anything is read, and the CRC is checked before
//! any field is trusted.

use bytes::Buf;
use thiserror::Error;

use super::crc::split_and_compute;
use super::types::*;

/// A successfully decoded inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundPacket {
    Telemetry {
        telemetry: Telemetry,
        layout: TelemetryLayout,
    },
    Hello(Hello),
}

/// Diagnostic category of a rejected datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Too short for the layout implied by its header
    MalformedPacket,
    /// Checksum did not match (corruption or desync)
    CrcMismatch,
    /// Header claimed by no inbound message type (protocol drift)
    UnknownHeader,
}

/// Why an inbound datagram was dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed packet: empty datagram")]
    Empty,

    #[error("malformed packet: header 0x{header:02X} needs at least {expected} bytes, got {actual}")]
    TooShort {
        header: u8,
        expected: usize,
        actual: usize,
    },

    #[error("unknown header 0x{header:02X} ({len} bytes)")]
    UnknownHeader { header: u8, len: usize },

    #[error("CRC mismatch on header 0x{header:02X} ({len} bytes): declared 0x{declared:04X}, computed 0x{computed:04X}")]
    CrcMismatch {
        header: u8,
        len: usize,
        declared: u16,
        computed: u16,
    },
}

impl DecodeError {
    /// Maps the error onto its diagnostic category.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            DecodeError::Empty | DecodeError::TooShort { .. } => FailureKind::MalformedPacket,
            DecodeError::UnknownHeader { .. } => FailureKind::UnknownHeader,
            DecodeError::CrcMismatch { .. } => FailureKind::CrcMismatch,
        }
    }
}

/// Result type for the decoder
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Decode a complete inbound datagram
///
/// # Arguments
///
/// * `datagram` - Raw bytes as received, including the trailing CRC
///
/// # Errors
///
/// Returns error if:
/// - Datagram is empty or too short for its inferred layout
/// - Header belongs to no inbound message type
/// - CRC check fails
///
/// # Examples
///
/// ```
/// use rov_link::protocol::decoder::{decode_packet, InboundPacket};
/// use rov_link::protocol::encoder::encode_hello;
///
/// let packet = decode_packet(&encode_hello(2)).unwrap();
/// assert!(matches!(packet, InboundPacket::Hello(h) if h.version == 2));
/// ```
pub fn decode_packet(datagram: &[u8]) -> DecodeResult<InboundPacket> {
    let header = *datagram.first().ok_or(DecodeError::Empty)?;
    let len = datagram.len();

    match header {
        HEADER_TELEMETRY => {
            require_len(header, len, TELEMETRY_V2_MIN_LEN)?;
            verify_crc(header, datagram)?;
            Ok(InboundPacket::Telemetry {
                telemetry: parse_telemetry_v2(datagram),
                layout: TelemetryLayout::V2,
            })
        }
        HEADER_HELLO => {
            require_len(header, len, HELLO_MIN_LEN)?;
            verify_crc(header, datagram)?;
            Ok(InboundPacket::Hello(Hello {
                version: datagram[1] as i8,
            }))
        }
        HEADER_CONTROL => Err(DecodeError::UnknownHeader { header, len }),
        _ if len >= TELEMETRY_V1_MIN_LEN => {
            verify_crc(header, datagram)?;
            Ok(InboundPacket::Telemetry {
                telemetry: parse_telemetry_v1(datagram),
                layout: TelemetryLayout::V1,
            })
        }
        _ => Err(DecodeError::UnknownHeader { header, len }),
    }
}

fn require_len(header: u8, actual: usize, expected: usize) -> DecodeResult<()> {
    if actual < expected {
        return Err(DecodeError::TooShort {
            header,
            expected,
            actual,
        });
    }
    Ok(())
}

fn verify_crc(header: u8, datagram: &[u8]) -> DecodeResult<()> {
    // Length was checked by the caller; every layout is longer than the CRC.
    let (declared, computed) = split_and_compute(datagram).ok_or(DecodeError::Empty)?;

    if declared != computed {
        return Err(DecodeError::CrcMismatch {
            header,
            len: datagram.len(),
            declared,
            computed,
        });
    }
    Ok(())
}

/// Fields shared by both layouts, read from `buf` positioned at depth.
fn parse_common(buf: &mut &[u8]) -> Telemetry {
    Telemetry {
        depth: buf.get_f32(),
        pitch: buf.get_f32(),
        yaw: buf.get_f32(),
        roll: buf.get_f32(),
        current: buf.get_f32(),
        voltage: buf.get_f32(),
        regulators_feedback: buf.get_u8(),
        manipulator_angle: buf.get_i8(),
        manipulator_state: buf.get_i8(),
        ..Telemetry::default()
    }
}

/// Legacy layout: 6×f32 | regulators | angle | state | ... | crc
fn parse_telemetry_v1(datagram: &[u8]) -> Telemetry {
    let mut buf = datagram;
    parse_common(&mut buf)
}

/// Current layout: 0xAE | version | 6×f32 | regulators | angle | state
/// | camera | temperature f32 | crc
fn parse_telemetry_v2(datagram: &[u8]) -> Telemetry {
    let mut buf = &datagram[2..];
    let mut telemetry = parse_common(&mut buf);
    telemetry.camera_index = buf.get_u8();
    telemetry.temperature = buf.get_f32();
    telemetry
}
