//! Wire frames sent by the host.

use byteorder::{BigEndian, ByteOrder};

use crate::checksum::crc8;
use crate::config::ProtocolConfig;
use crate::protocol::constants::METADATA_LEN;

/// Metadata message: `base_address` then `image_length`, both big-endian.
pub fn encode_metadata(base_address: u32, image_length: u32) -> [u8; METADATA_LEN] {
    let mut buf = [0u8; METADATA_LEN];
    BigEndian::write_u32(&mut buf[0..4], base_address);
    BigEndian::write_u32(&mut buf[4..8], image_length);
    buf
}

/// One slice of the image together with its integrity code.
///
/// A chunk is read from the image once and kept until the target
/// acknowledges it, so a resend puts the identical bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    offset: u32,
    payload: Vec<u8>,
    code: u8,
}

impl Chunk {
    pub fn new(offset: u32, payload: Vec<u8>, crc8_poly: u8) -> Self {
        let code = crc8(&payload, crc8_poly);
        Self {
            offset,
            payload,
            code,
        }
    }

    /// Image offset of the first payload byte.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes. Padding is never counted.
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// CRC-8 over the payload bytes.
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Serialise as `payload ‖ padding ‖ code`, exactly `frame_size` bytes.
    pub fn to_frame(&self, config: &ProtocolConfig) -> Vec<u8> {
        let mut frame = vec![config.pad_byte; config.frame_size];
        frame[..self.payload.len()].copy_from_slice(&self.payload);
        frame[config.frame_size - 1] = self.code;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    #[test]
    fn test_metadata_is_big_endian() {
        let buf = encode_metadata(0x0800_4000, 0x0001_2345);
        assert_eq!(buf, [0x08, 0x00, 0x40, 0x00, 0x00, 0x01, 0x23, 0x45]);

        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0x0800_4000);
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0x0001_2345);
    }

    #[test]
    fn test_full_chunk_frame_layout() {
        let config = ProtocolConfig::default();
        let payload: Vec<u8> = (0..CHUNK_SIZE).map(|i| i as u8).collect();
        let chunk = Chunk::new(0, payload.clone(), config.crc8_poly);
        let frame = chunk.to_frame(&config);

        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(&frame[..CHUNK_SIZE], &payload[..]);
        assert!(frame[CHUNK_SIZE..FRAME_SIZE - 1].iter().all(|&b| b == PAD_BYTE));
        assert_eq!(frame[FRAME_SIZE - 1], crc8(&payload, CRC8_POLY));
    }

    #[test]
    fn test_short_chunk_is_padded() {
        let config = ProtocolConfig::default();
        let chunk = Chunk::new(496, vec![0xAB; 10], config.crc8_poly);
        let frame = chunk.to_frame(&config);

        assert_eq!(chunk.len(), 10);
        assert_eq!(chunk.offset(), 496);
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(&frame[..10], &[0xAB; 10]);
        assert!(frame[10..FRAME_SIZE - 1].iter().all(|&b| b == PAD_BYTE));
        // Code covers the payload only, not the padding.
        assert_eq!(frame[FRAME_SIZE - 1], crc8(&[0xAB; 10], CRC8_POLY));
    }
}
