//! Handshake and metadata negotiation.
//!
//! Both steps tolerate line noise: a timeout or an unexpected response is
//! retried until the step's attempt budget runs out.

use tracing::{debug, info};

use super::HandlerContext;
use crate::error::{FlashError, Stage};
use crate::events::FlashObserver;
use crate::image::ImageSource;
use crate::protocol::{AckKind, encode_metadata};
use crate::state::machine::ProtocolState;
use crate::transport::Transport;

/// Handshaking - flush stale input, send the token, wait for the ACK.
pub fn handle_handshaking<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    debug!(attempt = ctx.session.retry_count() + 1, "Sending handshake token");
    ctx.transport.clear_input()?;
    ctx.transport.write_all(&ctx.config.handshake_token)?;

    let timeout = ctx.config.ack_timeout();
    match ctx.await_ack(Stage::Handshake, timeout) {
        Ok(ack) if ctx.classify(&ack) == AckKind::Ack => {
            info!("Handshake acknowledged");
            ctx.session.begin_step();
            Ok(ProtocolState::SendingMetadata)
        }
        Ok(ack) => ctx.retry_or_fail(
            FlashError::AckMismatch {
                stage: Stage::Handshake,
                received: ack,
            },
            ProtocolState::Handshaking,
        ),
        Err(e) if e.is_timeout() => ctx.retry_or_fail(e, ProtocolState::Handshaking),
        Err(e) => Err(e),
    }
}

/// SendingMetadata - base address and image length, big-endian.
pub fn handle_sending_metadata<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    let metadata = encode_metadata(
        ctx.session.target_base_address(),
        ctx.session.image_length(),
    );
    ctx.transport.write_all(&metadata)?;
    debug!(
        base = %format!("0x{:08X}", ctx.session.target_base_address()),
        length = ctx.session.image_length(),
        "Sent metadata"
    );
    Ok(ProtocolState::AwaitingMetadataAck)
}

/// AwaitingMetadataAck - a failure sends the metadata again.
pub fn handle_metadata_ack<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    let timeout = ctx.config.ack_timeout();
    match ctx.await_ack(Stage::Metadata, timeout) {
        Ok(ack) if ctx.classify(&ack) == AckKind::Ack => {
            info!("Metadata acknowledged");
            ctx.session.begin_step();
            if ctx.session.remaining() == 0 {
                Ok(ProtocolState::Complete)
            } else {
                Ok(ProtocolState::TransferringChunk)
            }
        }
        Ok(ack) => ctx.retry_or_fail(
            FlashError::AckMismatch {
                stage: Stage::Metadata,
                received: ack,
            },
            ProtocolState::SendingMetadata,
        ),
        Err(e) if e.is_timeout() => ctx.retry_or_fail(e, ProtocolState::SendingMetadata),
        Err(e) => Err(e),
    }
}
