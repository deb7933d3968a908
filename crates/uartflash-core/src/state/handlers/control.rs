//! Session start and completion.

use tracing::info;

use super::HandlerContext;
use crate::error::FlashError;
use crate::events::FlashObserver;
use crate::image::ImageSource;
use crate::state::machine::ProtocolState;
use crate::transport::Transport;

/// Idle - start the handshake.
pub fn handle_idle<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<ProtocolState, FlashError> {
    info!(
        base = %format!("0x{:08X}", ctx.session.target_base_address()),
        length = ctx.session.image_length(),
        chunks = ctx.config.chunk_count(ctx.session.image_length()),
        "Starting flash session"
    );
    ctx.session.begin_step();
    Ok(ProtocolState::Handshaking)
}

/// Complete - tell the target to start the new image. No reply is expected.
pub fn enter_complete<T: Transport, I: ImageSource, O: FlashObserver>(
    ctx: &mut HandlerContext<'_, T, I, O>,
) -> Result<(), FlashError> {
    ctx.transport.write_all(&ctx.config.jump_signal)?;
    info!(bytes_sent = ctx.session.bytes_sent(), "Sent jump-to-application signal");
    Ok(())
}
