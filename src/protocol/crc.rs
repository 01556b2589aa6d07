//! # CRC-16/CCITT Implementation
//!
//! CRC-16 checksum appended to every datagram exchanged with the vehicle.
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0xFFFF
//! **Bit order**: MSB first, no reflection, no final XOR (CRC-16/CCITT-FALSE)
//!
//! The vehicle firmware computes the same value; any divergence here corrupts
//! every packet in both directions.

/// CRC-16/CCITT polynomial
pub const CRC16_POLY: u16 = 0x1021;

/// CRC-16/CCITT seed
pub const CRC16_INIT: u16 = 0xFFFF;

/// Size of the trailing checksum on the wire
pub const CRC16_SIZE: usize = 2;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate CRC-16/CCITT checksum using lookup table
///
/// # Arguments
///
/// * `data` - Every byte of the datagram that precedes the checksum
///
/// # Returns
///
/// * `u16` - Calculated checksum, sent big-endian after the payload
///
/// # Examples
///
/// ```
/// use rov_link::protocol::crc::crc16_ccitt;
///
/// assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
/// ```
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        let index = ((crc >> 8) ^ byte as u16) & 0xFF;
        crc = (crc << 8) ^ CRC16_TABLE[index as usize];
    }

    crc
}

/// Check the trailing big-endian CRC of a complete datagram
///
/// Returns `(declared, computed)` so callers can report both on mismatch.
/// Returns `None` when the datagram is too short to carry a checksum.
pub fn split_and_compute(datagram: &[u8]) -> Option<(u16, u16)> {
    if datagram.len() < CRC16_SIZE {
        return None;
    }

    let (body, tail) = datagram.split_at(datagram.len() - CRC16_SIZE);
    let declared = u16::from_be_bytes([tail[0], tail[1]]);
    Some((declared, crc16_ccitt(body)))
}

/// Bit-by-bit CRC-16/CCITT (slow, for verification)
///
/// Mirrors the firmware's loop literally: XOR the byte into the top of the
/// register, shift eight times, mask to 16 bits after each shift.
#[allow(dead_code)]
fn crc16_ccitt_slow(data: &[u8]) -> u16 {
    let mut crc: u32 = CRC16_INIT as u32;

    for &byte in data {
        crc ^= (byte as u32) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY as u32;
            } else {
                crc <<= 1;
            }
            crc &= 0xFFFF;
        }
    }

    crc as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16_ccitt(&[]), CRC16_INIT);
    }

    #[test]
    fn test_crc16_check_value() {
        // Standard CRC-16/CCITT-FALSE check value
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
        assert_eq!(crc16_ccitt_slow(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_crc16_hello_frame() {
        // Hello header + version 2
        let data = [0xAA, 0x02];
        assert_eq!(crc16_ccitt(&data), crc16_ccitt_slow(&data));
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0xAE, 0x02, 0x40, 0x20, 0x00, 0x00],
            vec![0x00; 36],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16_ccitt(data),
                crc16_ccitt_slow(data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc16_deterministic() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(crc16_ccitt(&data), crc16_ccitt(&data));
    }

    #[test]
    fn test_crc16_detects_every_single_bit_flip() {
        let data: Vec<u8> = (0u8..40).map(|b| b.wrapping_mul(37)).collect();
        let original = crc16_ccitt(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[byte] ^= 1 << bit;
                assert_ne!(
                    crc16_ccitt(&flipped),
                    original,
                    "flip of byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_split_and_compute_valid() {
        let mut datagram = vec![0xAA, 0x02];
        let crc = crc16_ccitt(&datagram);
        datagram.extend_from_slice(&crc.to_be_bytes());

        let (declared, computed) = split_and_compute(&datagram).unwrap();
        assert_eq!(declared, computed);
    }

    #[test]
    fn test_split_and_compute_too_short() {
        assert!(split_and_compute(&[0xAA]).is_none());
    }
}
