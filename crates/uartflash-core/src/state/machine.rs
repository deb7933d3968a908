//! States of the flashing protocol.

use std::fmt;

use crate::error::FlashError;

/// Where a session is in the flashing protocol.
///
/// `Complete` and `Failed` are terminal: the engine performs no further I/O
/// once either is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProtocolState {
    /// Created, nothing sent yet.
    #[default]
    Idle,
    /// Sending the handshake token and waiting for its ACK.
    Handshaking,
    /// Sending base address and image length.
    SendingMetadata,
    /// Waiting for the metadata ACK.
    AwaitingMetadataAck,
    /// Sending the next (or the rejected) chunk.
    TransferringChunk,
    /// Waiting for the chunk ACK.
    AwaitingChunkAck,
    /// Image delivered and jump signal sent.
    Complete,
    /// Gave up, carrying the last error.
    Failed(FlashError),
}


impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolState::Idle => write!(f, "IDLE"),
            ProtocolState::Handshaking => write!(f, "HANDSHAKING"),
            ProtocolState::SendingMetadata => write!(f, "SENDING_METADATA"),
            ProtocolState::AwaitingMetadataAck => write!(f, "AWAITING_METADATA_ACK"),
            ProtocolState::TransferringChunk => write!(f, "TRANSFERRING_CHUNK"),
            ProtocolState::AwaitingChunkAck => write!(f, "AWAITING_CHUNK_ACK"),
            ProtocolState::Complete => write!(f, "COMPLETE"),
            ProtocolState::Failed(_) => write!(f, "FAILED"),
        }
    }
}

impl ProtocolState {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolState::Complete | ProtocolState::Failed(_))
    }

    /// Error carried by a `Failed` state.
    pub fn error(&self) -> Option<&FlashError> {
        match self {
            ProtocolState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ProtocolState::default(), ProtocolState::Idle);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ProtocolState::Idle.is_terminal());
        assert!(!ProtocolState::AwaitingChunkAck.is_terminal());
        assert!(ProtocolState::Complete.is_terminal());
        assert!(ProtocolState::Failed(FlashError::TransportIo("gone".into())).is_terminal());
    }

    #[test]
    fn test_failed_carries_error() {
        let state = ProtocolState::Failed(FlashError::ImageIo("short read".into()));
        assert_eq!(state.to_string(), "FAILED");
        assert_eq!(
            state.error(),
            Some(&FlashError::ImageIo("short read".into()))
        );
        assert_eq!(ProtocolState::Complete.error(), None);
    }
}
