//! Bus checksums for the two protocol variants in the vehicle family.
//!
//! The CRC variant is CRC-8H2F (AUTOSAR profile, polynomial 0x2F) computed over
//! every payload byte except byte 0 (the checksum/counter header), finalized with
//! a per-address constant selected by the counter nibble in byte 1. The receiving
//! ECU rejects any frame whose checksum deviates, so the constant table below must
//! match the platform byte-for-byte.

use static_assertions::const_assert_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// Table-driven CRC-8H2F with per-address finalization constant.
    Crc8h2f,
    /// XOR of every payload byte except the checksum byte itself.
    Xor,
}

/// CRC-8H2F substitution table, polynomial 0x2F, MSB first.
const CRC8H2F_TABLE: [u8; 256] = [
    0x00, 0x2F, 0x5E, 0x71, 0xBC, 0x93, 0xE2, 0xCD, 0x57, 0x78, 0x09, 0x26, 0xEB, 0xC4, 0xB5, 0x9A,
    0xAE, 0x81, 0xF0, 0xDF, 0x12, 0x3D, 0x4C, 0x63, 0xF9, 0xD6, 0xA7, 0x88, 0x45, 0x6A, 0x1B, 0x34,
    0x73, 0x5C, 0x2D, 0x02, 0xCF, 0xE0, 0x91, 0xBE, 0x24, 0x0B, 0x7A, 0x55, 0x98, 0xB7, 0xC6, 0xE9,
    0xDD, 0xF2, 0x83, 0xAC, 0x61, 0x4E, 0x3F, 0x10, 0x8A, 0xA5, 0xD4, 0xFB, 0x36, 0x19, 0x68, 0x47,
    0xE6, 0xC9, 0xB8, 0x97, 0x5A, 0x75, 0x04, 0x2B, 0xB1, 0x9E, 0xEF, 0xC0, 0x0D, 0x22, 0x53, 0x7C,
    0x48, 0x67, 0x16, 0x39, 0xF4, 0xDB, 0xAA, 0x85, 0x1F, 0x30, 0x41, 0x6E, 0xA3, 0x8C, 0xFD, 0xD2,
    0x95, 0xBA, 0xCB, 0xE4, 0x29, 0x06, 0x77, 0x58, 0xC2, 0xED, 0x9C, 0xB3, 0x7E, 0x51, 0x20, 0x0F,
    0x3B, 0x14, 0x65, 0x4A, 0x87, 0xA8, 0xD9, 0xF6, 0x6C, 0x43, 0x32, 0x1D, 0xD0, 0xFF, 0x8E, 0xA1,
    0xE3, 0xCC, 0xBD, 0x92, 0x5F, 0x70, 0x01, 0x2E, 0xB4, 0x9B, 0xEA, 0xC5, 0x08, 0x27, 0x56, 0x79,
    0x4D, 0x62, 0x13, 0x3C, 0xF1, 0xDE, 0xAF, 0x80, 0x1A, 0x35, 0x44, 0x6B, 0xA6, 0x89, 0xF8, 0xD7,
    0x90, 0xBF, 0xCE, 0xE1, 0x2C, 0x03, 0x72, 0x5D, 0xC7, 0xE8, 0x99, 0xB6, 0x7B, 0x54, 0x25, 0x0A,
    0x3E, 0x11, 0x60, 0x4F, 0x82, 0xAD, 0xDC, 0xF3, 0x69, 0x46, 0x37, 0x18, 0xD5, 0xFA, 0x8B, 0xA4,
    0x05, 0x2A, 0x5B, 0x74, 0xB9, 0x96, 0xE7, 0xC8, 0x52, 0x7D, 0x0C, 0x23, 0xEE, 0xC1, 0xB0, 0x9F,
    0xAB, 0x84, 0xF5, 0xDA, 0x17, 0x38, 0x49, 0x66, 0xFC, 0xD3, 0xA2, 0x8D, 0x40, 0x6F, 0x1E, 0x31,
    0x76, 0x59, 0x28, 0x07, 0xCA, 0xE5, 0x94, 0xBB, 0x21, 0x0E, 0x7F, 0x50, 0x9D, 0xB2, 0xC3, 0xEC,
    0xD8, 0xF7, 0x86, 0xA9, 0x64, 0x4B, 0x3A, 0x15, 0x8F, 0xA0, 0xD1, 0xFE, 0x33, 0x1C, 0x6D, 0x42,
];

const_assert_eq!(CRC8H2F_TABLE.len(), 256);

/// Finalization constants per arbitration address, indexed by the counter nibble
/// of payload byte 1.
const FINAL_CONSTANTS: [(u32, [u8; 16]); 10] = [
    // LH_EPS_03: EPS position and driver torque
    (0x09F, [0xF5; 16]),
    // TSK_06: drivetrain coordinator status
    (
        0x120,
        [
            0xC4, 0xE2, 0x4F, 0xE4, 0xF8, 0x2F, 0x56, 0x81, 0x9F, 0xE5, 0x83, 0x44, 0x05, 0x3F,
            0x97, 0xDF,
        ],
    ),
    // ACC_06: primary acceleration command
    (
        0x122,
        [
            0x37, 0x7D, 0xF3, 0xA9, 0x18, 0x46, 0x6D, 0x4D, 0x3D, 0x71, 0x92, 0x9C, 0xE5, 0x32,
            0x10, 0xB9,
        ],
    ),
    // HCA_01: heading control assist torque command
    (0x126, [0xDA; 16]),
    // GRA_ACC_01: steering wheel cruise buttons
    (
        0x12B,
        [
            0x6A, 0x38, 0xB4, 0x27, 0x22, 0xEF, 0xE1, 0xBB, 0xF8, 0x80, 0x84, 0x49, 0xC7, 0x9E,
            0x1E, 0x2B,
        ],
    ),
    // ACC_07: secondary acceleration command
    (
        0x12E,
        [
            0xF8, 0xE5, 0x97, 0xC9, 0xD6, 0x07, 0x47, 0x21, 0x66, 0xDD, 0xCF, 0x6F, 0xA1, 0x94,
            0x74, 0x63,
        ],
    ),
    // ACC_02: primary ACC HUD frame
    (0x30C, [0x0F; 16]),
    // LDW_02: lane assist HUD frame
    (0x30B, [0x77; 16]),
    // ACC_04: secondary ACC HUD frame
    (0x324, [0x27; 16]),
    // ACC_13: auxiliary ACC HUD frame
    (0x65F, [0xD6; 16]),
];

/// Table-driven CRC over `payload`, finalized with the per-address constant.
/// Returns 0 for an address outside the constant table; such frames never pass
/// bus acceptance, so the caller should not emit them.
pub fn crc8h2f(address: u32, payload: &[u8]) -> u8 {
    if payload.len() < 2 {
        return 0;
    }
    let Some(constants) = FINAL_CONSTANTS
        .iter()
        .find(|(addr, _)| *addr == address)
        .map(|(_, c)| c)
    else {
        return 0;
    };

    let mut crc: u8 = 0xFF;
    for byte in &payload[1..] {
        crc ^= byte;
        crc = CRC8H2F_TABLE[crc as usize];
    }
    let counter_nibble = (payload[1] & 0x0F) as usize;
    crc ^= constants[counter_nibble];
    crc = CRC8H2F_TABLE[crc as usize];
    crc ^ 0xFF
}

/// XOR of every payload byte except the checksum's own position.
pub fn xor_checksum(checksum_byte: usize, payload: &[u8]) -> u8 {
    payload
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != checksum_byte)
        .fold(0, |acc, (_, b)| acc ^ b)
}

/// Whether the CRC variant knows the finalization constant for `address`.
pub fn crc_address_known(address: u32) -> bool {
    FINAL_CONSTANTS.iter().any(|(addr, _)| *addr == address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_golden_vector_steering_command() {
        let payload = [0x00, 0x03, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        assert_eq!(crc8h2f(0x126, &payload), 0x44);
    }

    #[test]
    fn crc_golden_vector_cruise_buttons() {
        let payload = [0x00, 0x0A, 0xFF, 0x01, 0x80, 0x7F, 0x55, 0xAA];
        assert_eq!(crc8h2f(0x12B, &payload), 0x32);
    }

    #[test]
    fn crc_depends_on_counter_nibble() {
        // GRA_ACC_01 uses distinct constants per counter value, so two payloads
        // differing only in the counter nibble must not collide by construction.
        let a = [0x00, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let b = [0x00, 0x01, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        assert_ne!(crc8h2f(0x12B, &a), crc8h2f(0x12B, &b));
    }

    #[test]
    fn crc_unknown_address_is_rejected() {
        let payload = [0x00, 0x03, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        assert!(!crc_address_known(0x7FF));
        assert_eq!(crc8h2f(0x7FF, &payload), 0);
    }

    #[test]
    fn xor_golden_vector() {
        let payload = [0x00, 0x03, 0x12, 0x34, 0x56, 0x00, 0x00, 0x00];
        assert_eq!(xor_checksum(0, &payload), 0x73);
    }

    #[test]
    fn xor_skips_own_byte_position() {
        let payload = [0xAB, 0x01, 0x02];
        assert_eq!(xor_checksum(0, &payload), 0x01 ^ 0x02);
        assert_eq!(xor_checksum(2, &payload), 0xAB ^ 0x01);
    }
}
