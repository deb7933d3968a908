//! Protocol and serial-line configuration.
//!
//! Defaults come from [`crate::protocol::constants`]. Any subset of the
//! fields can be overridden from a TOML file.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::ACK_LEN;
use crate::protocol::constants::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_size must be at least 1")]
    EmptyChunk,
    #[error("chunk_size {chunk_size} plus integrity byte does not fit frame_size {frame_size}")]
    ChunkTooLarge {
        chunk_size: usize,
        frame_size: usize,
    },
    #[error("max_retries must be at least 1")]
    NoAttempts,
    #[error("ack_token and nack_token must differ")]
    AmbiguousTokens,
    #[error("jump_signal must not be empty")]
    EmptyJumpSignal,
}

/// Wire-level parameters of one bootloader revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Token that opens the handshake.
    pub handshake_token: [u8; ACK_LEN],
    /// Positive acknowledgement token.
    pub ack_token: [u8; ACK_LEN],
    /// Negative acknowledgement token.
    pub nack_token: [u8; ACK_LEN],
    /// Bytes that tell the target to start the new image.
    pub jump_signal: Vec<u8>,
    /// Maximum payload bytes per frame.
    pub chunk_size: usize,
    /// Total frame size, integrity byte included.
    pub frame_size: usize,
    pub pad_byte: u8,
    pub crc8_poly: u8,
    /// Attempts per step before the session fails.
    pub max_retries: u8,
    /// Timeout for handshake and metadata acknowledgements.
    pub ack_timeout_ms: u64,
    /// Timeout for chunk acknowledgements.
    pub chunk_ack_timeout_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            handshake_token: HANDSHAKE_TOKEN,
            ack_token: ACK_TOKEN,
            nack_token: NACK_TOKEN,
            jump_signal: JUMP_SIGNAL.to_vec(),
            chunk_size: CHUNK_SIZE,
            frame_size: FRAME_SIZE,
            pad_byte: PAD_BYTE,
            crc8_poly: CRC8_POLY,
            max_retries: MAX_RETRIES,
            ack_timeout_ms: ACK_TIMEOUT_MS,
            chunk_ack_timeout_ms: CHUNK_ACK_TIMEOUT_MS,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::EmptyChunk);
        }
        if self.chunk_size + 1 > self.frame_size {
            return Err(ConfigError::ChunkTooLarge {
                chunk_size: self.chunk_size,
                frame_size: self.frame_size,
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.ack_token == self.nack_token {
            return Err(ConfigError::AmbiguousTokens);
        }
        if self.jump_signal.is_empty() {
            return Err(ConfigError::EmptyJumpSignal);
        }
        Ok(())
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn chunk_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_ack_timeout_ms)
    }

    /// Number of frames needed for an image of `image_length` bytes.
    pub fn chunk_count(&self, image_length: u32) -> u32 {
        (image_length as u64).div_ceil(self.chunk_size as u64) as u32
    }
}

/// Serial line settings. Framing is fixed at 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Complete configuration of a flashing run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    pub serial: SerialSettings,
    pub protocol: ProtocolConfig,
}

impl FlashConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: FlashConfig = toml::from_str(content)?;
        config.protocol.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProtocolConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.ack_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_bad_framing() {
        let config = ProtocolConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyChunk));

        let config = ProtocolConfig {
            chunk_size: 256,
            frame_size: 256,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChunkTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let config = ProtocolConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoAttempts));

        let config = ProtocolConfig {
            nack_token: ACK_TOKEN,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::AmbiguousTokens));

        let config = ProtocolConfig {
            jump_signal: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyJumpSignal));
    }

    #[test]
    fn test_chunk_count() {
        let config = ProtocolConfig::default();
        assert_eq!(config.chunk_count(0), 0);
        assert_eq!(config.chunk_count(1), 1);
        assert_eq!(config.chunk_count(248), 1);
        assert_eq!(config.chunk_count(249), 2);
        assert_eq!(config.chunk_count(248 * 10), 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FlashConfig::from_toml(
            r#"
            [serial]
            baud_rate = 9600

            [protocol]
            chunk_size = 244
            ack_token = [0x79, 0x79]
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.protocol.chunk_size, 244);
        assert_eq!(config.protocol.ack_token, [0x79, 0x79]);
        assert_eq!(config.protocol.frame_size, FRAME_SIZE);
        assert_eq!(config.protocol.handshake_token, HANDSHAKE_TOKEN);
    }

    #[test]
    fn test_invalid_toml_config_rejected() {
        let result = FlashConfig::from_toml("[protocol]\nmax_retries = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = FlashConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(FlashConfig::from_toml(&text).unwrap(), config);
    }
}
