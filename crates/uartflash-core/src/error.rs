//! Errors surfaced by a flashing session.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::image::ImageError;
use crate::protocol::Acknowledgement;
use crate::transport::TransportError;

/// Protocol step an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Handshake,
    Metadata,
    /// Chunk starting at the given image offset.
    Chunk { offset: u32 },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Handshake => write!(f, "handshake"),
            Stage::Metadata => write!(f, "metadata"),
            Stage::Chunk { offset } => write!(f, "chunk at offset 0x{:08X}", offset),
        }
    }
}

/// Error carried by a `Failed` session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlashError {
    #[error("Failed to open transport: {0}")]
    TransportOpen(String),

    #[error("Transport I/O error: {0}")]
    TransportIo(String),

    #[error("No response during {stage} within {timeout_ms}ms")]
    Timeout { stage: Stage, timeout_ms: u64 },

    #[error("Unexpected response during {stage}: {received}")]
    AckMismatch {
        stage: Stage,
        received: Acknowledgement,
    },

    #[error("Target rejected chunk at offset 0x{offset:08X} (integrity code 0x{code:02X})")]
    ChecksumMismatch { offset: u32, code: u8 },

    #[error("Image I/O error: {0}")]
    ImageIo(String),

    #[error("Invalid protocol configuration: {0}")]
    InvalidConfig(String),
}

impl FlashError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FlashError::Timeout { .. })
    }
}

impl From<TransportError> for FlashError {
    fn from(e: TransportError) -> Self {
        match &e {
            TransportError::OpenFailed { .. } | TransportError::ConfigureFailed(_) => {
                FlashError::TransportOpen(e.to_string())
            }
            _ => FlashError::TransportIo(e.to_string()),
        }
    }
}

impl From<ImageError> for FlashError {
    fn from(e: ImageError) -> Self {
        FlashError::ImageIo(e.to_string())
    }
}

impl From<ConfigError> for FlashError {
    fn from(e: ConfigError) -> Self {
        FlashError::InvalidConfig(e.to_string())
    }
}
