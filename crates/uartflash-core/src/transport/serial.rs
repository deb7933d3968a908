//! serialport-based transport implementation.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info, instrument, warn};

use super::traits::{Transport, TransportError};
use crate::config::SerialSettings;
use crate::protocol::constants::ACK_TIMEOUT_MS;

/// Serial port transport, raw 8N1 without flow control.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialTransport {
    /// Open and configure the serial device at `path`.
    #[instrument(level = "info", skip(settings), fields(baud = settings.baud_rate))]
    pub fn open(path: &str, settings: &SerialSettings) -> Result<Self, TransportError> {
        let port = serialport::new(path, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(ACK_TIMEOUT_MS))
            .open()
            .map_err(|e| TransportError::OpenFailed {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        port.clear(ClearBuffer::All)
            .map_err(|e| TransportError::ConfigureFailed(e.to_string()))?;

        info!(path = %path, baud = settings.baud_rate, "Serial port opened");

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Transport for SerialTransport {
    #[instrument(skip(self, data), fields(len = data.len()))]
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let n = self
            .port
            .write(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        self.port
            .flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        debug!(bytes_written = n, "Write complete");
        Ok(n)
    }

    #[instrument(skip(self))]
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;

        let mut buf = vec![0u8; max_len];
        match self.port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                debug!(bytes_read = n, "Read complete");
                Ok(buf)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                debug!(timeout_ms = timeout.as_millis() as u64, "Read timed out");
                Ok(Vec::new())
            }
            Err(e) => Err(TransportError::ReadFailed(e.to_string())),
        }
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if let Err(e) = self.port.clear(ClearBuffer::All) {
            warn!(path = %self.path, error = %e, "Failed to flush port on close");
        }
    }
}
