//! Integrity codes used by the flashing protocol.
//!
//! Two independent checksums are in play and must not be mixed up:
//!
//! - a whole-image CRC-32 used to fingerprint the image that was delivered.
//!   The bootloader computes it on the STM32 CRC unit, which is fed one
//!   image byte per 32-bit word, so every byte enters the MPEG-2 register
//!   zero-extended to `[0, 0, 0, byte]`;
//! - a per-chunk CRC-8 (register `0xFF`, MSB-first, no final XOR) appended as
//!   the last byte of every chunk frame and checked by the target.

use std::fmt;
use std::sync::OnceLock;

use crc::{Algorithm, CRC_32_MPEG_2, Crc, Digest};

/// Initial CRC-32 register value.
pub const CRC32_INIT: u32 = 0xFFFF_FFFF;

/// Initial CRC-8 register value.
pub const CRC8_INIT: u8 = 0xFF;

static CRC32_MPEG2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

const fn crc8_algorithm(poly: u8) -> Algorithm<u8> {
    Algorithm {
        width: 8,
        poly,
        init: CRC8_INIT,
        refin: false,
        refout: false,
        xorout: 0x00,
        check: 0x00,
        residue: 0x00,
    }
}

/// One CRC-8 parameter set per possible polynomial.
static CRC8_ALGORITHMS: [Algorithm<u8>; 256] = {
    let mut algorithms = [const { crc8_algorithm(0) }; 256];
    let mut poly = 0;
    while poly < 256 {
        algorithms[poly] = crc8_algorithm(poly as u8);
        poly += 1;
    }
    algorithms
};

/// Lookup tables, built on first use of a polynomial.
static CRC8_ENGINES: [OnceLock<Crc<u8>>; 256] = [const { OnceLock::new() }; 256];

fn crc8_engine(poly: u8) -> &'static Crc<u8> {
    CRC8_ENGINES[poly as usize].get_or_init(|| Crc::<u8>::new(&CRC8_ALGORITHMS[poly as usize]))
}

/// Streaming whole-image CRC-32.
///
/// Feeding the image in pieces yields the same value as [`crc32`] over the
/// concatenated bytes.
#[derive(Clone)]
pub struct Crc32 {
    digest: Digest<'static, u32>,
}

impl Crc32 {
    pub fn new() -> Self {
        Self {
            digest: CRC32_MPEG2.digest(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.digest.update(&[0, 0, 0, byte]);
        }
    }

    /// Current register value. No final XOR is applied.
    pub fn finalize(&self) -> u32 {
        self.digest.clone().finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crc32(0x{:08X})", self.finalize())
    }
}

/// CRC-32 of a complete buffer.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

/// CRC-8 of a chunk payload with the given polynomial.
pub fn crc8(data: &[u8], poly: u8) -> u8 {
    crc8_engine(poly).checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::CRC8_POLY;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0x1556_F485);
    }

    #[test]
    fn test_crc32_empty_is_init() {
        assert_eq!(crc32(&[]), 0xFFFF_FFFF);
        assert_eq!(Crc32::new().finalize(), CRC32_INIT);
    }

    #[test]
    fn test_crc32_single_bytes() {
        assert_eq!(crc32(&[0x00]), 0xC704_DD7B);
        assert_eq!(crc32(&[0xAB]), 0x1D60_4014);
    }

    #[test]
    fn test_crc32_feeds_bytes_as_words() {
        let data = b"ab";
        let words = [0, 0, 0, b'a', 0, 0, 0, b'b'];
        assert_eq!(crc32(data), CRC32_MPEG2.checksum(&words));
        assert_eq!(crc32(data), 0x8081_23DC);
        assert_ne!(crc32(data), CRC32_MPEG2.checksum(data));
    }

    #[test]
    fn test_crc32_deterministic() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        assert_eq!(crc32(&data), crc32(&data));
    }

    #[test]
    fn test_crc32_streaming_matches_oneshot() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 + 3) as u8).collect();
        let mut crc = Crc32::new();
        for piece in data.chunks(37) {
            crc.update(piece);
        }
        assert_eq!(crc.finalize(), crc32(&data));
        // finalize does not consume the running value
        assert_eq!(crc.finalize(), crc32(&data));
    }

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8(b"123456789", CRC8_POLY), 0xFB);
    }

    #[test]
    fn test_crc8_known_inputs() {
        assert_eq!(crc8(&[], CRC8_POLY), 0xFF);
        assert_eq!(crc8(&[0x00], CRC8_POLY), 0xF3);
        let ramp: Vec<u8> = (0..10).collect();
        assert_eq!(crc8(&ramp, CRC8_POLY), 0xA8);
    }

    #[test]
    fn test_crc8_poly_is_honoured() {
        let data = b"123456789";
        assert_ne!(crc8(data, 0x31), crc8(data, CRC8_POLY));
        assert_eq!(crc8(data, 0x31), crc8(data, 0x31));
    }

    #[test]
    fn test_crc8_detects_single_bit_flip() {
        let mut data = vec![0x5Au8; 248];
        let good = crc8(&data, CRC8_POLY);
        data[100] ^= 0x01;
        assert_ne!(crc8(&data, CRC8_POLY), good);
    }
}
