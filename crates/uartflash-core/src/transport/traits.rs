//! Byte-channel transport abstraction.
//!
//! Defines the `Transport` trait the protocol engine talks through,
//! allowing different implementations (serial port, mock, etc.).

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::protocol::{ACK_LEN, Acknowledgement};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("Failed to configure port: {0}")]
    ConfigureFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Device disconnected")]
    Disconnected,
}

/// Abstract duplex byte channel.
///
/// This trait enables:
/// - Production implementation over a serial port
/// - Mock implementation for unit testing
pub trait Transport: Send {
    /// Write bytes, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read up to `max_len` bytes, blocking at most `timeout`.
    ///
    /// An empty vector means the timeout expired with nothing received.
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Discard anything already sitting in the receive buffer.
    fn clear_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Write the whole buffer, continuing after short writes.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut remaining = data;
        while !remaining.is_empty() {
            let n = self.write(remaining)?;
            if n == 0 {
                return Err(TransportError::WriteFailed(format!(
                    "transport accepted 0 of {} bytes",
                    remaining.len()
                )));
            }
            remaining = &remaining[n.min(remaining.len())..];
        }
        Ok(())
    }

    /// Read one acknowledgement token.
    ///
    /// `timeout` bounds the whole token, not each read. Returns `None` when
    /// nothing arrived in time; a response cut short by the deadline is
    /// returned as a partial acknowledgement.
    fn read_ack(&mut self, timeout: Duration) -> Result<Option<Acknowledgement>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut buf = Vec::with_capacity(ACK_LEN);
        let mut remaining = timeout;
        while buf.len() < ACK_LEN {
            let bytes = self.read(ACK_LEN - buf.len(), remaining)?;
            if bytes.is_empty() {
                break;
            }
            buf.extend_from_slice(&bytes);
            remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
        }
        if buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Acknowledgement::from_bytes(&buf)))
        }
    }
}
