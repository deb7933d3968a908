//! Acknowledgement parsing and classification.
//!
//! Every step of the protocol is answered by a 2-byte token. The target may
//! also answer with fewer bytes when the line drops mid-response, so the
//! parsed value remembers how many bytes actually arrived.

use std::fmt;

/// Length of an acknowledgement token on the wire.
pub const ACK_LEN: usize = 2;

/// How a response relates to the configured tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// Matches the ACK token.
    Ack,
    /// Matches the NACK token.
    Nack,
    /// Anything else, including a short response.
    Unexpected,
}

/// Response read from the target.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    bytes: [u8; ACK_LEN],
    len: u8,
}

impl Acknowledgement {
    /// Build from raw bytes. Anything past [`ACK_LEN`] is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(ACK_LEN);
        let mut buf = [0u8; ACK_LEN];
        buf[..len].copy_from_slice(&bytes[..len]);
        Self {
            bytes: buf,
            len: len as u8,
        }
    }

    pub const fn from_token(token: [u8; ACK_LEN]) -> Self {
        Self {
            bytes: token,
            len: ACK_LEN as u8,
        }
    }

    /// Bytes that were actually received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when all [`ACK_LEN`] bytes arrived.
    pub fn is_complete(&self) -> bool {
        self.len() == ACK_LEN
    }

    pub fn matches(&self, token: &[u8; ACK_LEN]) -> bool {
        self.is_complete() && &self.bytes == token
    }

    pub fn classify(&self, ack: &[u8; ACK_LEN], nack: &[u8; ACK_LEN]) -> AckKind {
        if self.matches(ack) {
            AckKind::Ack
        } else if self.matches(nack) {
            AckKind::Nack
        } else {
            AckKind::Unexpected
        }
    }
}

impl fmt::Debug for Acknowledgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Acknowledgement({})", self)
    }
}

impl fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<empty>");
        }
        let hex: Vec<String> = self
            .as_bytes()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect();
        write!(f, "{}", hex.join(" "))
    }
}
