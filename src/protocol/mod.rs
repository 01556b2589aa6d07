//! # Vehicle Wire Protocol
//!
//! Versioned binary protocol spoken with the ROV over UDP.
//!
//! This module handles:
//! - Control command encoding (int8 or float32 axes, 2 or 3 camera axes)
//! - Telemetry decoding (legacy v1 and current v2 layouts) and hello handling
//! - CRC-16/CCITT checksum calculation
//! - Header/length dispatch and validation

pub mod types;
pub mod encoder;
pub mod decoder;
pub mod crc;
