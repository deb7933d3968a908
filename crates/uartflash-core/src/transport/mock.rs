//! Mock transport for testing.

use std::collections::VecDeque;
use std::time::Duration;

use super::traits::{Transport, TransportError};
use crate::protocol::ACK_LEN;
use crate::protocol::constants::{ACK_TOKEN, NACK_TOKEN};

/// Scripted answer to one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// The configured ACK token.
    Ack,
    /// The configured NACK token.
    Nack,
    /// Nothing arrives before the timeout.
    Silence,
    /// Arbitrary bytes.
    Bytes(Vec<u8>),
    /// The read fails below the protocol layer.
    Error(String),
}

/// Mock transport for unit testing state machine logic.
///
/// Each read that finds no buffered bytes consumes the next scripted reply.
/// Once the script is exhausted every read times out.
#[derive(Debug)]
pub struct MockTransport {
    /// Queued replies to return on read.
    replies: VecDeque<MockReply>,
    /// Bytes of the current reply not yet handed out.
    rx_buffer: VecDeque<u8>,
    /// Captured writes.
    write_log: Vec<Vec<u8>>,
    /// Reads issued, including ones that timed out.
    read_calls: usize,
    clear_calls: usize,
    /// Cap on bytes accepted per write, to exercise short writes.
    max_write: Option<usize>,
    /// Whether the device is "connected".
    connected: bool,
    ack_token: [u8; ACK_LEN],
    nack_token: [u8; ACK_LEN],
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            rx_buffer: VecDeque::new(),
            write_log: Vec::new(),
            read_calls: 0,
            clear_calls: 0,
            max_write: None,
            connected: true,
            ack_token: ACK_TOKEN,
            nack_token: NACK_TOKEN,
        }
    }

    /// Use non-default tokens for [`MockReply::Ack`] and [`MockReply::Nack`].
    pub fn with_tokens(mut self, ack: [u8; ACK_LEN], nack: [u8; ACK_LEN]) -> Self {
        self.ack_token = ack;
        self.nack_token = nack;
        self
    }

    /// Accept at most `max` bytes per write call.
    pub fn with_max_write(mut self, max: usize) -> Self {
        self.max_write = Some(max);
        self
    }

    /// Queue a reply to be returned on a future read.
    pub fn queue(&mut self, reply: MockReply) {
        self.replies.push_back(reply);
    }

    /// Queue `count` ACK replies.
    pub fn queue_acks(&mut self, count: usize) {
        for _ in 0..count {
            self.queue(MockReply::Ack);
        }
    }

    /// Get all captured writes.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.write_log
    }

    /// Captured writes of exactly `len` bytes.
    pub fn writes_of_len(&self, len: usize) -> Vec<&[u8]> {
        self.write_log
            .iter()
            .filter(|w| w.len() == len)
            .map(|w| w.as_slice())
            .collect()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls
    }

    /// Simulate device disconnect.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Simulate device reconnect.
    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    fn take_buffered(&mut self, max_len: usize) -> Vec<u8> {
        let n = max_len.min(self.rx_buffer.len());
        self.rx_buffer.drain(..n).collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        let n = self.max_write.map_or(data.len(), |max| max.min(data.len()));
        self.write_log.push(data[..n].to_vec());
        Ok(n)
    }

    fn read(&mut self, max_len: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        self.read_calls += 1;

        if !self.rx_buffer.is_empty() {
            return Ok(self.take_buffered(max_len));
        }

        match self.replies.pop_front() {
            None | Some(MockReply::Silence) => Ok(Vec::new()),
            Some(MockReply::Ack) => {
                self.rx_buffer.extend(self.ack_token);
                Ok(self.take_buffered(max_len))
            }
            Some(MockReply::Nack) => {
                self.rx_buffer.extend(self.nack_token);
                Ok(self.take_buffered(max_len))
            }
            Some(MockReply::Bytes(bytes)) => {
                self.rx_buffer.extend(bytes);
                Ok(self.take_buffered(max_len))
            }
            Some(MockReply::Error(message)) => Err(TransportError::ReadFailed(message)),
        }
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.clear_calls += 1;
        self.rx_buffer.clear();
        Ok(())
    }
}
