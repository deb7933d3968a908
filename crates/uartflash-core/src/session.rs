//! Session - state and progress of one flashing attempt.
//!
//! A session is created by the caller, mutated only by the protocol engine
//! and discarded once it reaches `Complete` or `Failed`. Everything a run
//! needs between steps lives here, so an engine can be reused for another
//! session without leftover state.

use tracing::debug;

use crate::checksum::Crc32;
use crate::error::FlashError;
use crate::image::{ImageError, ImageSource};
use crate::protocol::Chunk;
use crate::state::ProtocolState;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashReport {
    pub target_base_address: u32,
    pub image_length: u32,
    pub bytes_sent: u32,
    /// Chunk frames written, resends included.
    pub frames_sent: u32,
    pub resends: u32,
    /// CRC-32 of the acknowledged payload bytes, in image order.
    pub image_crc32: u32,
}

#[derive(Debug, Clone)]
pub struct Session {
    target_base_address: u32,
    image_length: u32,
    bytes_sent: u32,
    state: ProtocolState,
    retry_count: u8,
    /// Chunk written but not yet acknowledged.
    pending: Option<Chunk>,
    crc: Crc32,
    frames_sent: u32,
    resends: u32,
}

impl Session {
    pub fn new(target_base_address: u32, image_length: u32) -> Self {
        Self {
            target_base_address,
            image_length,
            bytes_sent: 0,
            state: ProtocolState::Idle,
            retry_count: 0,
            pending: None,
            crc: Crc32::new(),
            frames_sent: 0,
            resends: 0,
        }
    }

    /// Session sized from an image source.
    pub fn for_image<I: ImageSource>(
        target_base_address: u32,
        image: &I,
    ) -> Result<Self, FlashError> {
        let size = image.size();
        let image_length = u32::try_from(size).map_err(|_| ImageError::TooLarge { size })?;
        Ok(Self::new(target_base_address, image_length))
    }

    pub fn target_base_address(&self) -> u32 {
        self.target_base_address
    }

    pub fn image_length(&self) -> u32 {
        self.image_length
    }

    pub fn bytes_sent(&self) -> u32 {
        self.bytes_sent
    }

    /// Bytes still to be acknowledged.
    pub fn remaining(&self) -> u32 {
        self.image_length - self.bytes_sent
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Failed attempts of the current step.
    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn resends(&self) -> u32 {
        self.resends
    }

    /// CRC-32 of everything acknowledged so far.
    pub fn image_crc32(&self) -> u32 {
        self.crc.finalize()
    }

    pub fn pending_chunk(&self) -> Option<&Chunk> {
        self.pending.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn error(&self) -> Option<&FlashError> {
        self.state.error()
    }

    pub fn report(&self) -> FlashReport {
        FlashReport {
            target_base_address: self.target_base_address,
            image_length: self.image_length,
            bytes_sent: self.bytes_sent,
            frames_sent: self.frames_sent,
            resends: self.resends,
            image_crc32: self.image_crc32(),
        }
    }

    /// Transition to a new state, returning the previous one.
    pub(crate) fn goto_state(&mut self, new_state: ProtocolState) -> ProtocolState {
        debug!(from = %self.state, to = %new_state, "State transition");
        std::mem::replace(&mut self.state, new_state)
    }

    /// Entering a new step: its retry budget starts from zero.
    pub(crate) fn begin_step(&mut self) {
        self.retry_count = 0;
    }

    /// Count a failed attempt. Returns whether another attempt is allowed.
    pub(crate) fn record_failed_attempt(&mut self, max_retries: u8) -> bool {
        self.retry_count = self.retry_count.saturating_add(1).min(max_retries);
        self.retry_count < max_retries
    }

    pub(crate) fn take_pending(&mut self) -> Option<Chunk> {
        self.pending.take()
    }

    pub(crate) fn set_pending(&mut self, chunk: Chunk) {
        self.pending = Some(chunk);
    }

    pub(crate) fn record_frame(&mut self, resend: bool) {
        self.frames_sent += 1;
        if resend {
            self.resends += 1;
        }
    }

    /// Account for an acknowledged chunk.
    pub(crate) fn accept_chunk(&mut self, chunk: &Chunk) {
        debug_assert_eq!(chunk.offset(), self.bytes_sent);
        let len = chunk.len().min(self.remaining());
        self.bytes_sent += len;
        self.crc.update(&chunk.payload()[..len as usize]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::crc32;
    use crate::image::MemoryImage;

    #[test]
    fn test_new_session() {
        let session = Session::new(0x0800_0000, 1000);
        assert_eq!(session.state(), &ProtocolState::Idle);
        assert_eq!(session.bytes_sent(), 0);
        assert_eq!(session.remaining(), 1000);
        assert_eq!(session.retry_count(), 0);
        assert!(session.pending_chunk().is_none());
        assert_eq!(session.image_crc32(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_for_image_takes_length() {
        let image = MemoryImage::new(vec![0; 300]);
        let session = Session::for_image(0x2000_0000, &image).unwrap();
        assert_eq!(session.image_length(), 300);
        assert_eq!(session.target_base_address(), 0x2000_0000);
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        let mut session = Session::new(0, 10);
        assert!(session.record_failed_attempt(3));
        assert!(session.record_failed_attempt(3));
        assert!(!session.record_failed_attempt(3));
        assert_eq!(session.retry_count(), 3);
        assert!(!session.record_failed_attempt(3));
        assert_eq!(session.retry_count(), 3);

        session.begin_step();
        assert_eq!(session.retry_count(), 0);
    }

    #[test]
    fn test_accept_chunk_tracks_payload_only() {
        let mut session = Session::new(0, 10);
        let first = Chunk::new(0, vec![1, 2, 3, 4, 5, 6], 0x07);
        let second = Chunk::new(6, vec![7, 8, 9, 10], 0x07);

        session.accept_chunk(&first);
        assert_eq!(session.bytes_sent(), 6);
        session.accept_chunk(&second);
        assert_eq!(session.bytes_sent(), 10);
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.image_crc32(), crc32(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
    }

    #[test]
    fn test_goto_state_returns_previous() {
        let mut session = Session::new(0, 0);
        let prev = session.goto_state(ProtocolState::Handshaking);
        assert_eq!(prev, ProtocolState::Idle);
        assert_eq!(session.state(), &ProtocolState::Handshaking);
    }

    #[test]
    fn test_report() {
        let mut session = Session::new(0x100, 4);
        session.record_frame(false);
        session.record_frame(true);
        session.accept_chunk(&Chunk::new(0, vec![0xAA; 4], 0x07));

        let report = session.report();
        assert_eq!(report.target_base_address, 0x100);
        assert_eq!(report.bytes_sent, 4);
        assert_eq!(report.frames_sent, 2);
        assert_eq!(report.resends, 1);
        assert_eq!(report.image_crc32, crc32(&[0xAA; 4]));
    }
}
