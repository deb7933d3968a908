//! Chunked image transfer.
//!
//! A chunk is read from the image exactly once. Until the target ACKs it,
//! it stays in the session and a NACK or garbled reply resends those same
//! bytes. A missing reply is fatal: a vanished target cannot be told apart
//! from a dropped link, and carrying on could leave a corrupt image behind.

use tracing::{debug, warn};

use super::HandlerContext;
use crate::error::{FlashError, Stage};
use crate::events::{FlashEvent, FlashObserver};
use crate::image::ImageSource;
use crate::protocol::{AckKind, Chunk};
use crate::state::machine::ProtocolState;
use crate::transport::Transport;

/// TransferringChunk - write the pending chunk, or read the next one.
pub fn handle_transferring_chunk<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    if ctx.session.remaining() == 0 {
        return Ok(ProtocolState::Complete);
    }

    let (chunk, resend) = match ctx.session.take_pending() {
        Some(chunk) => (chunk, true),
        None => {
            ctx.session.begin_step();
            (read_next_chunk(ctx)?, false)
        }
    };

    let frame = chunk.to_frame(ctx.config);
    debug!(
        offset = chunk.offset(),
        len = chunk.len(),
        code = %format!("0x{:02X}", chunk.code()),
        resend,
        "Sending chunk"
    );
    ctx.session.set_pending(chunk);
    ctx.transport.write_all(&frame)?;
    ctx.session.record_frame(resend);

    Ok(ProtocolState::AwaitingChunkAck)
}

fn read_next_chunk<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<Chunk, FlashError> {
    let offset = ctx.session.bytes_sent();
    let len = ctx.session.remaining().min(ctx.config.chunk_size as u32) as usize;
    let mut payload = vec![0u8; len];
    ctx.image.read_at(offset as u64, &mut payload)?;
    Ok(Chunk::new(offset, payload, ctx.config.crc8_poly))
}

/// AwaitingChunkAck - advance on ACK, resend on NACK or garbage, fail on
/// silence.
pub fn handle_chunk_ack<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    let offset = ctx.session.bytes_sent();
    let stage = Stage::Chunk { offset };
    let timeout = ctx.config.chunk_ack_timeout();
    let ack = ctx.await_ack(stage, timeout)?;

    match ctx.classify(&ack) {
        AckKind::Ack => {
            if let Some(chunk) = ctx.session.take_pending() {
                ctx.session.accept_chunk(&chunk);
            }
            ctx.emit(FlashEvent::Progress {
                bytes_sent: ctx.session.bytes_sent(),
                total: ctx.session.image_length(),
            });
            if ctx.session.remaining() == 0 {
                Ok(ProtocolState::Complete)
            } else {
                Ok(ProtocolState::TransferringChunk)
            }
        }
        AckKind::Nack => {
            let code = ctx.session.pending_chunk().map_or(0, Chunk::code);
            warn!(offset, code = %format!("0x{:02X}", code), "Target rejected chunk");
            ctx.retry_or_fail(
                FlashError::ChecksumMismatch { offset, code },
                ProtocolState::TransferringChunk,
            )
        }
        AckKind::Unexpected => ctx.retry_or_fail(
            FlashError::AckMismatch {
                stage,
                received: ack,
            },
            ProtocolState::TransferringChunk,
        ),
    }
}
