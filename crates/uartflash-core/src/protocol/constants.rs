//! Protocol constants for the serial bootloader.
//!
//! These are the defaults of [`ProtocolConfig`](crate::config::ProtocolConfig).
//! The state machine never reads them directly, so a different bootloader
//! revision only needs a different configuration.

// ============================================================================
// Tokens (Host -> Target)
// ============================================================================

/// Handshake token sent to wake the bootloader.
pub const HANDSHAKE_TOKEN: [u8; 2] = [0xDE, 0xAD];

/// Jump-to-application signal sent once the whole image is acknowledged.
pub const JUMP_SIGNAL: [u8; 2] = [0x4A, 0x4D]; // 'JM'

// ============================================================================
// Tokens (Target -> Host)
// ============================================================================

/// Positive acknowledgement.
pub const ACK_TOKEN: [u8; 2] = [0x06, 0x06];

/// Negative acknowledgement (step rejected, e.g. bad chunk integrity code).
pub const NACK_TOKEN: [u8; 2] = [0x15, 0x15];

// ============================================================================
// Framing
// ============================================================================

/// Size of one chunk frame on the wire. Fits a single atomic write.
pub const FRAME_SIZE: usize = 256;

/// Maximum payload bytes carried by one frame.
pub const CHUNK_SIZE: usize = 248;

/// Filler between the payload and the trailing integrity byte.
pub const PAD_BYTE: u8 = 0xFF;

/// Metadata message: base address (u32 BE) followed by image length (u32 BE).
pub const METADATA_LEN: usize = 8;

/// CRC-8 polynomial for the per-chunk integrity code.
pub const CRC8_POLY: u8 = 0x07;

// ============================================================================
// Retry / timeout policy
// ============================================================================

/// Attempts allowed per step before the session fails.
pub const MAX_RETRIES: u8 = 3;

/// Handshake and metadata acknowledgement timeout (10 deciseconds).
pub const ACK_TIMEOUT_MS: u64 = 1000;

/// Chunk acknowledgement timeout.
pub const CHUNK_ACK_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Serial line
// ============================================================================

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
