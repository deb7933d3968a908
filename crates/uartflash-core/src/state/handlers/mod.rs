//! State handlers - the entry action of each protocol state.
//!
//! This module is split into submodules by functionality:
//! - `control`: session start and the jump-to-application signal
//! - `handshake`: handshake and metadata negotiation
//! - `transfer`: chunked image transfer

mod control;
mod handshake;
mod transfer;

use std::time::Duration;

use crate::config::ProtocolConfig;
use crate::error::{FlashError, Stage};
use crate::events::{FlashEvent, FlashObserver};
use crate::image::ImageSource;
use crate::protocol::{AckKind, Acknowledgement};
use crate::session::Session;
use crate::state::machine::ProtocolState;
use crate::transport::Transport;

pub use control::enter_complete;
use control::handle_idle;
use handshake::{handle_handshaking, handle_metadata_ack, handle_sending_metadata};
use transfer::{handle_chunk_ack, handle_transferring_chunk};

/// Handler context containing all resources of one step.
pub struct HandlerContext<'a, T: Transport, I: ImageSource, O: FlashObserver> {
    pub transport: &'a mut T,
    pub image: &'a mut I,
    pub config: &'a ProtocolConfig,
    pub observer: &'a O,
    pub session: &'a mut Session,
}

impl<'a, T: Transport, I: ImageSource, O: FlashObserver> HandlerContext<'a, T, I, O> {
    pub(crate) fn emit(&self, event: FlashEvent) {
        self.observer.on_event(&event);
    }

    /// Read one acknowledgement. Silence for the whole timeout is a
    /// `Timeout` error.
    pub(crate) fn await_ack(
        &mut self,
        stage: Stage,
        timeout: Duration,
    ) -> Result<Acknowledgement, FlashError> {
        self.transport
            .read_ack(timeout)?
            .ok_or(FlashError::Timeout {
                stage,
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    pub(crate) fn classify(&self, ack: &Acknowledgement) -> AckKind {
        ack.classify(&self.config.ack_token, &self.config.nack_token)
    }

    /// Count a failed attempt of the current step. Returns `retry_state` if
    /// the budget allows another attempt, otherwise the error itself.
    pub(crate) fn retry_or_fail(
        &mut self,
        error: FlashError,
        retry_state: ProtocolState,
    ) -> Result<ProtocolState, FlashError> {
        let max_attempts = self.config.max_retries;
        if self.session.record_failed_attempt(max_attempts) {
            self.emit(FlashEvent::Retry {
                state: retry_state.clone(),
                attempt: self.session.retry_count(),
                max_attempts,
                error,
            });
            Ok(retry_state)
        } else {
            Err(error)
        }
    }
}

/// Run the entry action of the session's current state and return the
/// state to move to. An error means the session fails with it.
pub fn handle_state<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    let state = ctx.session.state().clone();
    match state {
        ProtocolState::Idle => handle_idle(ctx),
        ProtocolState::Handshaking => handle_handshaking(ctx),
        ProtocolState::SendingMetadata => handle_sending_metadata(ctx),
        ProtocolState::AwaitingMetadataAck => handle_metadata_ack(ctx),
        ProtocolState::TransferringChunk => handle_transferring_chunk(ctx),
        ProtocolState::AwaitingChunkAck => handle_chunk_ack(ctx),
        terminal @ (ProtocolState::Complete | ProtocolState::Failed(_)) => Ok(terminal),
    }
}
